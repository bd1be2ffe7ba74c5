use std::ffi::c_char;

use crate::ffi::ERROR_MESSAGE_CAPACITY;

/// A fixed-size, zero-initialised text buffer that `getLastErrorMessage` writes a
/// NUL-terminated message into.
///
/// The library does not report how much it wrote, so the buffer is always handed over at full
/// [`ERROR_MESSAGE_CAPACITY`] and decoded up to the first NUL byte. The final byte is reset to
/// zero before decoding, so an unterminated message is cut at `ERROR_MESSAGE_CAPACITY - 1` bytes.
pub struct ErrorMessageBuffer {
    data: Box<[u8; ERROR_MESSAGE_CAPACITY]>,
}

impl Default for ErrorMessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorMessageBuffer {
    pub fn new() -> Self {
        Self {
            data: Box::new([0; ERROR_MESSAGE_CAPACITY]),
        }
    }

    /// The pointer to pass to `getLastErrorMessage`
    pub fn as_mut_ptr(&mut self) -> *mut c_char {
        self.data.as_mut_ptr().cast()
    }

    pub fn capacity(&self) -> usize {
        ERROR_MESSAGE_CAPACITY
    }

    /// Decode the message as UTF-8, replacing invalid sequences
    pub fn to_string_lossy(&mut self) -> String {
        self.data[ERROR_MESSAGE_CAPACITY - 1] = 0;
        let end = self
            .data
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(ERROR_MESSAGE_CAPACITY - 1);
        String::from_utf8_lossy(&self.data[..end]).into_owned()
    }
}
