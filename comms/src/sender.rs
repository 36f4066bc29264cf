//! The sending end of the framed link.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, LenType, Serialize};

/// The sending handle of a framed link.
///
/// Keeps an internal buffer that is reused between sends.
pub struct FrameSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> FrameSender<W> {
    /// Creates a new `FrameSender`.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    ///
    /// # Returns
    /// A new `FrameSender` instance.
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            buf: Vec::new(),
        }
    }

    /// Writes `msg` as a single frame and flushes the writer.
    ///
    /// # Arguments
    /// * `msg` - A serializable value.
    ///
    /// # Returns
    /// An io error if writing to the underlying writer fails.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        let Self { buf, tx } = self;

        buf.clear();
        buf.resize(LEN_TYPE_SIZE, 0);

        let trailing = msg.serialize(buf);
        let len = buf.len() - LEN_TYPE_SIZE + trailing.map(<[_]>::len).unwrap_or_default();
        let prefix = (len as LenType).to_be_bytes();
        buf[..LEN_TYPE_SIZE].copy_from_slice(&prefix);

        tx.write_all(buf).await?;

        if let Some(data) = trailing {
            tx.write_all(data).await?;
        }

        tx.flush().await
    }
}
