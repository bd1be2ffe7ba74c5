use std::io::{self, prelude::*};

/// Complex-valued samples as two parallel arrays of equal length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplexSeries {
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
}

impl ComplexSeries {
    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    /// Iterate over `(real, imaginary)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.real.iter().copied().zip(self.imag.iter().copied())
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.iter().map(|(re, im)| re.hypot(im)).collect()
    }
}

/// Every raw scan of a result, as stored by the detector: one row per scan, one column per
/// pixel, unsigned 16-bit samples in row-major order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanMatrix {
    rows: usize,
    cols: usize,
    data: Vec<u16>,
}

impl ScanMatrix {
    /// Wrap a row-major buffer. Returns `None` if `data` does not hold exactly
    /// `rows * cols` samples.
    pub fn new(rows: usize, cols: usize, data: Vec<u16>) -> Option<Self> {
        (rows.checked_mul(cols) == Some(data.len())).then_some(Self { rows, cols, data })
    }

    /// The number of scans
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// The number of pixels per scan
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.data
    }

    /// The samples of scan `index`
    pub fn row(&self, index: usize) -> Option<&[u16]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.cols;
        Some(&self.data[start..start + self.cols])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u16]> + '_ {
        // `chunks_exact` rejects a zero width, and a zero-width matrix has no rows anyway
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Widen every sample to `f64` for numeric work
    pub fn to_f64(&self) -> Vec<f64> {
        self.data.iter().map(|v| f64::from(*v)).collect()
    }

    /// The per-pixel mean over all scans
    pub fn column_means(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.cols];
        for row in self.rows() {
            for (acc, v) in sums.iter_mut().zip(row) {
                *acc += f64::from(*v);
            }
        }
        if self.rows > 0 {
            let n = self.rows as f64;
            sums.iter_mut().for_each(|acc| *acc /= n);
        }
        sums
    }

    /// Write the samples as little-endian `u16`, two bytes each, without any header
    pub fn write_raw<W: Write>(&self, mut writer: W) -> io::Result<()> {
        #[cfg(target_endian = "little")]
        writer.write_all(bytemuck::cast_slice(&self.data))?;
        #[cfg(target_endian = "big")]
        for v in self.data.iter() {
            writer.write_all(&v.to_le_bytes())?;
        }
        writer.flush()
    }

    /// Read back `rows * cols` little-endian samples written by [`ScanMatrix::write_raw`]
    pub fn read_raw<R: Read>(mut reader: R, rows: usize, cols: usize) -> io::Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "scan matrix shape overflows")
        })?;
        let mut data = vec![0u16; len];
        reader.read_exact(bytemuck::cast_slice_mut(&mut data))?;
        #[cfg(target_endian = "big")]
        data.iter_mut().for_each(|v| *v = u16::from_le(*v));
        Ok(Self { rows, cols, data })
    }
}
