//! Counted UTF-16 strings in the layout the native driver routines expect.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CountedStringError {
    #[error("string of {0} UTF-16 units does not fit a counted string")]
    TooLong(usize),
}

/// `UNICODE_STRING`: byte lengths followed by a pointer to the characters.
#[repr(C)]
#[derive(Debug)]
pub struct RawCountedString {
    /// Bytes in use, excluding any terminator.
    pub length: u16,
    /// Bytes available in `buffer`.
    pub maximum_length: u16,
    pub buffer: *mut u16,
}

/// An owned counted string backed by a NUL-terminated UTF-16 buffer.
///
/// The raw view stays valid for as long as the value lives: moving the value
/// moves the `Vec` header, not its heap allocation.
pub struct CountedString {
    raw: RawCountedString,
    buffer: Vec<u16>,
}

impl CountedString {
    pub fn new(value: &str) -> Result<Self, CountedStringError> {
        let mut buffer: Vec<u16> = value.encode_utf16().collect();
        let units = buffer.len();
        // Terminator included, the capacity in bytes must still fit a u16.
        if (units + 1) * 2 > u16::MAX as usize {
            return Err(CountedStringError::TooLong(units));
        }
        buffer.push(0);

        let length = (units * 2) as u16;
        let raw = RawCountedString {
            length,
            maximum_length: length + 2,
            buffer: buffer.as_mut_ptr(),
        };
        Ok(Self { raw, buffer })
    }

    #[inline]
    pub fn byte_len(&self) -> u16 {
        self.raw.length
    }

    #[inline]
    pub fn max_byte_len(&self) -> u16 {
        self.raw.maximum_length
    }

    /// Characters in use, without the terminator.
    #[inline]
    pub fn as_utf16(&self) -> &[u16] {
        &self.buffer[..self.raw.length as usize / 2]
    }

    /// Pointer handed to the native routine.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut RawCountedString {
        &mut self.raw
    }
}

impl fmt::Display for CountedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf16_lossy(self.as_utf16()))
    }
}

impl fmt::Debug for CountedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountedString")
            .field("length", &self.raw.length)
            .field("maximum_length", &self.raw.maximum_length)
            .field("value", &self.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_are_in_bytes_and_exclude_terminator() {
        let s = CountedString::new(r"\Registry\Machine").unwrap();
        assert_eq!(s.byte_len(), 17 * 2);
        assert_eq!(s.max_byte_len(), 17 * 2 + 2);
        assert_eq!(s.to_string(), r"\Registry\Machine");
    }

    #[test]
    fn buffer_is_nul_terminated_behind_the_counted_range() {
        let mut s = CountedString::new("drv").unwrap();
        let raw = s.as_mut_ptr();
        // SAFETY: `raw` points into `s`, which is alive for this block.
        let tail = unsafe { *(*raw).buffer.add(3) };
        assert_eq!(tail, 0);
        assert_eq!(s.as_utf16(), &[b'd' as u16, b'r' as u16, b'v' as u16]);
    }

    #[test]
    fn non_ascii_counts_utf16_units() {
        let s = CountedString::new("tréiber\u{1F600}").unwrap();
        // 7 BMP characters + one surrogate pair
        assert_eq!(s.byte_len(), 9 * 2);
    }

    #[test]
    fn rejects_strings_past_u16_capacity() {
        let longest = "a".repeat(u16::MAX as usize / 2 - 1);
        assert!(CountedString::new(&longest).is_ok());

        let too_long = "a".repeat(u16::MAX as usize / 2);
        assert_eq!(
            CountedString::new(&too_long).unwrap_err(),
            CountedStringError::TooLong(u16::MAX as usize / 2)
        );
    }
}
