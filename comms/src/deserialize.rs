use std::io;

/// Reads a value out of the body of a frame, borrowing from it where possible.
pub trait Deserialize<'a>: Sized {
    /// Deserializes a value from `buf`.
    ///
    /// # Arguments
    /// * `buf` - The frame body, without the length prefix.
    ///
    /// # Returns
    /// The value or an `InvalidData` io error.
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
