//! The two-phase "ask for the size, then fetch into a buffer of exactly that size" protocol
//! shared by all of GlazLib's variable-length getters.
//!
//! The callers in [`crate::wrap`] hold the session lock across both phases, so nothing can run
//! between the size query and the fetch.
use std::ffi::c_int;
use std::ptr;

use glazlib_sys::NativeLibrary;

use crate::error::{GlazError, GlazResult, NativeFailure};

/// Run a getter of the form `f(..., size: *mut c_int, data: *mut T)` twice: once with a null
/// data pointer to learn the element count, then with a buffer of exactly that many elements.
///
/// On the fetch the size slot is pre-loaded with the buffer's capacity. A reported count of
/// zero or less means there is no data, the fetch is skipped and the result is empty.
pub(crate) fn read_sized<T, F>(
    library: &NativeLibrary,
    operation: &'static str,
    mut call: F,
) -> GlazResult<Vec<T>>
where
    T: Copy + Default,
    F: FnMut(*mut c_int, *mut T) -> c_int,
{
    let mut size: c_int = 0;
    check(library, operation, call(&mut size, ptr::null_mut()))?;
    let Some(capacity) = positive(size) else {
        tracing::debug!(operation, size, "no data available");
        return Ok(Vec::new());
    };

    let mut buffer = allocate(operation, capacity, 1, capacity)?;
    let mut written = size;
    check(library, operation, call(&mut written, buffer.as_mut_ptr()))?;
    truncate_to_reported(operation, &mut buffer, written);
    Ok(buffer)
}

/// [`read_sized`] for getters that fill two parallel arrays, e.g. real and imaginary parts
pub(crate) fn read_sized_pair<T, F>(
    library: &NativeLibrary,
    operation: &'static str,
    mut call: F,
) -> GlazResult<(Vec<T>, Vec<T>)>
where
    T: Copy + Default,
    F: FnMut(*mut c_int, *mut T, *mut T) -> c_int,
{
    let mut size: c_int = 0;
    check(
        library,
        operation,
        call(&mut size, ptr::null_mut(), ptr::null_mut()),
    )?;
    let Some(capacity) = positive(size) else {
        tracing::debug!(operation, size, "no data available");
        return Ok((Vec::new(), Vec::new()));
    };

    let mut first = allocate(operation, capacity, 1, capacity)?;
    let mut second = allocate(operation, capacity, 1, capacity)?;
    let mut written = size;
    check(
        library,
        operation,
        call(&mut written, first.as_mut_ptr(), second.as_mut_ptr()),
    )?;
    truncate_to_reported(operation, &mut first, written);
    truncate_to_reported(operation, &mut second, written);
    Ok((first, second))
}

/// The matrix variant: `sizes` reports `(rows, cols)`, and `fetch` fills a flat row-major
/// buffer of `rows * cols` elements. Either dimension being zero or less means no data.
pub(crate) fn read_matrix<T, S, F>(
    library: &NativeLibrary,
    size_operation: &'static str,
    operation: &'static str,
    sizes: S,
    fetch: F,
) -> GlazResult<(usize, usize, Vec<T>)>
where
    T: Copy + Default,
    S: FnOnce(*mut c_int, *mut c_int) -> c_int,
    F: FnOnce(*mut T) -> c_int,
{
    let (rows, cols) = query_matrix_size(library, size_operation, sizes)?;
    if rows == 0 || cols == 0 {
        tracing::debug!(operation, rows, cols, "no data available");
        return Ok((0, 0, Vec::new()));
    }
    let len = rows
        .checked_mul(cols)
        .ok_or(GlazError::BufferSize { operation, rows, cols })?;

    let mut buffer = allocate(operation, rows, cols, len)?;
    check(library, operation, fetch(buffer.as_mut_ptr()))?;
    Ok((rows, cols, buffer))
}

/// Ask for a `(rows, cols)` pair, clamping non-positive dimensions to zero
pub(crate) fn query_matrix_size<S>(
    library: &NativeLibrary,
    operation: &'static str,
    sizes: S,
) -> GlazResult<(usize, usize)>
where
    S: FnOnce(*mut c_int, *mut c_int) -> c_int,
{
    let mut rows: c_int = 0;
    let mut cols: c_int = 0;
    check(library, operation, sizes(&mut rows, &mut cols))?;
    Ok((positive(rows).unwrap_or(0), positive(cols).unwrap_or(0)))
}

fn check(library: &NativeLibrary, operation: &'static str, code: c_int) -> GlazResult<()> {
    NativeFailure::check(library, operation, code).map_err(GlazError::Retrieval)
}

fn positive(size: c_int) -> Option<usize> {
    usize::try_from(size).ok().filter(|n| *n > 0)
}

/// Sizes come from the native side, so a refused allocation is an error rather than an abort
fn allocate<T: Copy + Default>(
    operation: &'static str,
    rows: usize,
    cols: usize,
    len: usize,
) -> GlazResult<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|err| {
        tracing::error!(operation, rows, cols, "cannot allocate a buffer of {len} elements: {err}");
        GlazError::BufferSize { operation, rows, cols }
    })?;
    buffer.resize(len, T::default());
    Ok(buffer)
}

fn truncate_to_reported<T>(operation: &'static str, buffer: &mut Vec<T>, written: c_int) {
    let written = usize::try_from(written).unwrap_or(0);
    if written != buffer.len() {
        tracing::warn!(
            operation,
            allocated = buffer.len(),
            written,
            "size changed between query and fetch"
        );
        buffer.truncate(written);
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use glazlib_sys::ffi;

    use tracing_test::traced_test;

    use super::*;
    use crate::error::Status;
    use crate::simulated;

    #[test]
    fn test_empty_when_size_not_positive() {
        let lib = simulated::native();
        for reported in [0, -3] {
            let calls = RefCell::new(0);
            let data: Vec<f64> = read_sized(&lib, "getResult", |size, data: *mut f64| {
                *calls.borrow_mut() += 1;
                assert!(data.is_null());
                unsafe { *size = reported };
                ffi::ERROR_NONE
            })
            .unwrap();
            assert!(data.is_empty());
            assert_eq!(*calls.borrow(), 1, "fetch must be skipped for size {reported}");
        }
    }

    #[test]
    fn test_fetch_buffer_matches_reported_size() {
        let lib = simulated::native();
        let seen = RefCell::new(Vec::new());
        let data: Vec<f64> = read_sized(&lib, "getScan", |size, data: *mut f64| {
            if data.is_null() {
                unsafe { *size = 4 };
            } else {
                seen.borrow_mut().push(unsafe { *size });
                for i in 0..4 {
                    unsafe { *data.add(i) = i as f64 * 0.5 };
                }
            }
            ffi::ERROR_NONE
        })
        .unwrap();
        assert_eq!(data, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(*seen.borrow(), vec![4]);
    }

    #[test]
    fn test_shrunk_fetch_is_truncated() {
        let lib = simulated::native();
        let data: Vec<i32> = read_sized(&lib, "getAUXCycleCounts", |size, data: *mut i32| {
            if data.is_null() {
                unsafe { *size = 5 };
            } else {
                unsafe {
                    *size = 2;
                    *data = 7;
                    *data.add(1) = 8;
                }
            }
            ffi::ERROR_NONE
        })
        .unwrap();
        assert_eq!(data, vec![7, 8]);
    }

    #[test]
    fn test_pair_buffers() {
        let lib = simulated::native();
        let (re, im): (Vec<f64>, Vec<f64>) = read_sized_pair(&lib, "getComplexResult", |size, a: *mut f64, b: *mut f64| {
            if a.is_null() {
                assert!(b.is_null());
                unsafe { *size = 2 };
            } else {
                unsafe {
                    assert_eq!(*size, 2);
                    *a = 1.0;
                    *a.add(1) = 2.0;
                    *b = -1.0;
                    *b.add(1) = -2.0;
                }
            }
            ffi::ERROR_NONE
        })
        .unwrap();
        assert_eq!(re, vec![1.0, 2.0]);
        assert_eq!(im, vec![-1.0, -2.0]);
    }

    #[test]
    fn test_failure_reads_message_and_stops() {
        let lib = simulated::native();
        simulated::with_device(|d| d.last_error = "Invalid calculation index".into());
        let calls = RefCell::new(0);
        let err = read_sized::<f64, _>(&lib, "getResult", |_, _| {
            *calls.borrow_mut() += 1;
            ffi::ERROR_INVALID_CALCULATION_INDEX
        })
        .unwrap_err();
        assert_eq!(*calls.borrow(), 1);
        let err = match err {
            GlazError::Retrieval(failure) => failure,
            other => panic!("expected a retrieval failure, got {other:?}"),
        };
        assert_eq!(err.status, Status::InvalidCalculationIndex);
        assert_eq!(err.operation, "getResult");
        assert_eq!(err.message, "Invalid calculation index");
    }

    #[test]
    fn test_matrix_skips_fetch_on_empty_dimension() {
        let lib = simulated::native();
        let fetched = RefCell::new(false);
        let (rows, cols, data) = read_matrix::<u16, _, _>(
            &lib,
            "getAllScansSizes",
            "getAllScans",
            |rows, cols| {
                unsafe {
                    *rows = 3;
                    *cols = 0;
                }
                ffi::ERROR_NONE
            },
            |_| {
                *fetched.borrow_mut() = true;
                ffi::ERROR_NONE
            },
        )
        .unwrap();
        assert_eq!((rows, cols), (0, 0));
        assert!(data.is_empty());
        assert!(!*fetched.borrow());
    }

    #[test]
    fn test_matrix_buffer_is_rows_times_cols() {
        let lib = simulated::native();
        let (rows, cols, data) = read_matrix::<u16, _, _>(
            &lib,
            "getAllScansSizes",
            "getAllScans",
            |rows, cols| {
                unsafe {
                    *rows = 2;
                    *cols = 3;
                }
                ffi::ERROR_NONE
            },
            |data| {
                for i in 0..6 {
                    unsafe { *data.add(i) = i as u16 };
                }
                ffi::ERROR_NONE
            },
        )
        .unwrap();
        assert_eq!((rows, cols), (2, 3));
        assert_eq!(data, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    #[traced_test]
    fn test_grown_fetch_keeps_allocation() {
        let lib = simulated::native();
        let data: Vec<f64> = read_sized(&lib, "getPDValues", |size, data: *mut f64| {
            if data.is_null() {
                unsafe { *size = 3 };
            } else {
                unsafe {
                    assert_eq!(*size, 3);
                    for i in 0..3 {
                        *data.add(i) = 1.0 + i as f64;
                    }
                    *size = 10;
                }
            }
            ffi::ERROR_NONE
        })
        .unwrap();
        assert_eq!(data, vec![1.0, 2.0, 3.0]);
        assert!(logs_contain("size changed between query and fetch"));
    }

    #[test]
    fn test_oversized_matrix_is_refused() {
        let lib = simulated::native();
        let fetched = RefCell::new(false);
        let err = read_matrix::<u16, _, _>(
            &lib,
            "getAllScansSizes",
            "getAllScans",
            |rows, cols| {
                unsafe {
                    *rows = c_int::MAX;
                    *cols = c_int::MAX;
                }
                ffi::ERROR_NONE
            },
            |_| {
                *fetched.borrow_mut() = true;
                ffi::ERROR_NONE
            },
        )
        .unwrap_err();
        assert!(
            matches!(err, GlazError::BufferSize { operation: "getAllScans", .. }),
            "{err:?}"
        );
        assert!(!*fetched.borrow());
    }
}
