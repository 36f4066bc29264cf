//! The receiving end of the framed link.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Align4, Deserialize, LEN_TYPE_SIZE, LenType};

/// The receiving handle of a framed link.
pub struct FrameReceiver<R: AsyncRead + Unpin> {
    rx: R,
}

impl<R: AsyncRead + Unpin> FrameReceiver<R> {
    /// Creates a new `FrameReceiver`.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    ///
    /// # Returns
    /// A new `FrameReceiver` instance.
    pub(super) fn new(rx: R) -> Self {
        Self { rx }
    }

    /// Waits for the next frame and deserializes it.
    ///
    /// # Arguments
    /// * `buf` - The buffer the frame body is read into, the returned value borrows from it.
    ///   Its element type keeps the body 4 byte aligned.
    ///
    /// # Returns
    /// The deserialized value or an io error.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Align4,
    {
        let mut len_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut len_buf).await?;
        let len = LenType::from_be_bytes(len_buf) as usize;

        let needed = len.div_ceil(size_of::<B>());
        buf.resize(needed, bytemuck::Zeroable::zeroed());

        let view: &mut [u8] = bytemuck::cast_slice_mut(buf.as_mut_slice());
        let body = &mut view[..len];
        self.rx.read_exact(body).await?;

        T::deserialize(body)
    }
}
