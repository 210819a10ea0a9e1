/// A read-only byte buffer backing a packet view.
#[derive(Debug, Clone, Copy)]
pub struct Buffer<'a>(&'a [u8]);

impl<'a> Buffer<'a> {
    pub const fn new(packet: &'a [u8]) -> Self {
        Self(packet)
    }

    /// Access the buffer as a slice of bytes.
    pub const fn as_slice(&self) -> &'a [u8] {
        self.0
    }

    /// Get N bytes from the packet at a given byte offset.
    pub fn get_bytes<const N: usize>(&self, offset: usize) -> [u8; N] {
        core::array::from_fn(|i| self.read(offset + i))
    }

    /// Get the value at a given offset.
    pub fn read(&self, offset: usize) -> u8 {
        self.0[offset]
    }
}
