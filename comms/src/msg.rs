use std::{borrow::Cow, io};

use crate::{Deserialize, Serialize};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR: Header = 0;
const CONTROL: Header = 1;
const GRAD: Header = 2;
const PARAMS: Header = 3;

/// The numeric payload for the `Data` variant of `Msg`.
#[derive(Debug, PartialEq)]
pub enum Payload<'a> {
    /// A flat gradient buffer, loss slot included.
    Grad(&'a [f32]),
    /// A flat parameter buffer, bias first and weights after.
    Params(&'a [f32]),
}

/// The command for the `Control` variant of `Msg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Sent once by a non-root worker right after connecting to the root.
    Join { rank: usize, world_size: usize },
    /// A worker arrived at a barrier.
    Barrier,
    /// Every worker arrived, the barrier is lifted.
    Release,
    /// The sender is done and about to close the link.
    Disconnect,
}

/// The application layer message exchanged between workers.
#[derive(Debug, PartialEq)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// A short name for the message kind, used for logging and error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(Command::Join { .. }) => "control/join",
            Msg::Control(Command::Barrier) => "control/barrier",
            Msg::Control(Command::Release) => "control/release",
            Msg::Control(Command::Disconnect) => "control/disconnect",
            Msg::Data(Payload::Grad(_)) => "data/grad",
            Msg::Data(Payload::Params(_)) => "data/params",
            Msg::Err(_) => "err",
        }
    }

    fn body_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The frame body is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid message kind {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        match self {
            Msg::Err(detail) => {
                buf.extend_from_slice(&ERR.to_be_bytes());
                Some(detail.as_bytes())
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL.to_be_bytes());

                // SAFETY: `Command` derives its `Serialize` impl and holds no maps,
                //         writing it into a vec can't fail.
                serde_json::to_writer(buf, cmd).unwrap();
                None
            }
            Msg::Data(payload) => {
                let (kind, nums) = match payload {
                    Payload::Grad(grad) => (GRAD, *grad),
                    Payload::Params(params) => (PARAMS, *params),
                };

                buf.extend_from_slice(&kind.to_be_bytes());
                Some(bytemuck::cast_slice(nums))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::body_is_too_small(buf.len());
        }

        let (kind_buf, rest) = buf.split_at(HEADER_SIZE);

        // SAFETY: `kind_buf` is exactly `HEADER_SIZE` bytes long.
        let kind = Header::from_be_bytes(kind_buf.try_into().unwrap());

        match kind {
            ERR => {
                let detail = std::str::from_utf8(rest)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

                Ok(Self::Err(Cow::Borrowed(detail)))
            }
            CONTROL => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            GRAD | PARAMS => {
                let nums = bytemuck::try_cast_slice(rest).map_err(|e| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("{e:?}"))
                })?;

                let payload = match kind {
                    GRAD => Payload::Grad(nums),
                    _ => Payload::Params(nums),
                };

                Ok(Self::Data(payload))
            }
            kind => Self::invalid_kind(kind),
        }
    }
}
