//! Binary buffer writer over a pre-sized buffer.

/// A binary buffer writer for outputs whose size is computed up front.
///
/// [`Writer::with_size`] allocates the whole buffer once; the cursor then
/// walks forward. Writing past the reserved size still works (the buffer
/// grows), but callers that size correctly never reallocate.
///
/// # Example
///
/// ```
/// use binpack_buffers::Writer;
///
/// let mut writer = Writer::with_size(3);
/// writer.u8(0x01);
/// writer.u16(0x0203);
/// assert!(writer.is_full());
/// assert_eq!(writer.finish(), [0x01, 0x02, 0x03]);
/// ```
#[derive(Debug, Default)]
pub struct Writer {
    /// The underlying byte buffer.
    pub uint8: Vec<u8>,
    /// Current cursor position.
    pub x: usize,
}

impl Writer {
    /// Creates a writer backed by a zeroed buffer of exactly `size` bytes.
    pub fn with_size(size: usize) -> Self {
        Self {
            uint8: vec![0u8; size],
            x: 0,
        }
    }

    /// Returns `true` when the cursor sits at the end of the buffer.
    pub fn is_full(&self) -> bool {
        self.x == self.uint8.len()
    }

    /// Ensures the buffer has at least `capacity` bytes available.
    #[inline]
    fn ensure_capacity(&mut self, capacity: usize) {
        let required = self.x + capacity;
        if required > self.uint8.len() {
            self.uint8.resize(required, 0);
        }
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.ensure_capacity(1);
        self.uint8[self.x] = val;
        self.x += 1;
    }

    /// Writes an unsigned 16-bit integer (big-endian).
    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.buf(&val.to_be_bytes());
    }

    /// Writes an unsigned 16-bit integer (little-endian).
    #[inline]
    pub fn u16_le(&mut self, val: u16) {
        self.buf(&val.to_le_bytes());
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        let length = buf.len();
        self.ensure_capacity(length);
        self.uint8[self.x..self.x + length].copy_from_slice(buf);
        self.x += length;
    }

    /// Consumes the writer and returns the bytes written so far.
    pub fn finish(mut self) -> Vec<u8> {
        self.uint8.truncate(self.x);
        self.uint8
    }
}
