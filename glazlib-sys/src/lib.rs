//! This crate locates and loads the proprietary `GlazLib` spectrometer control library at
//! runtime and exposes its C call surface as a table of typed function pointers. See
//! [`glazlib`](../glazlib) for safe bindings.
//!
//! For regular use, call [`get_library`] to get the process-wide handle, or
//! [`set_library_dir`] to pre-specify the directory the platform builds live under
//! (`win64/`, `win64-static/`, `win32/`, `win32-static/`, `linux64/`). Alternatively, set the
//! `GLAZLIB_LIBRARY_DIR` environment variable.
//!
//! Every function in [`ffi`] is `unsafe`: the declared signatures must match the binary
//! exactly, and pointer arguments follow the vendor's conventions documented there.
pub mod ffi;
mod buffer;
mod runtime;

pub use crate::buffer::ErrorMessageBuffer;
pub use crate::ffi::FunctionTable;
pub use crate::runtime::{
    LIBRARY_DIR_ENV, LoadError, NativeLibrary, get_library, search_roots, set_library_dir,
};
