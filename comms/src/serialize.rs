/// Writes a value into the body of a frame.
pub trait Serialize<'a> {
    /// Serializes `self` into `buf`.
    ///
    /// Large numeric payloads are not copied into `buf`, they are returned so the sender
    /// can write them straight after the buffered prefix.
    ///
    /// # Arguments
    /// * `buf` - The frame buffer, already holding the length prefix.
    ///
    /// # Returns
    /// An optional trailing slice of bytes to write after `buf`.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
