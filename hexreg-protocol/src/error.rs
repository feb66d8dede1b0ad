use std::{error::Error, fmt::Display};

/// Errors that may occur when parsing a payload into a frame.
#[derive(Debug, Eq, PartialEq)]
pub enum FrameError {
    /// The payload is not exactly six bytes long.
    WrongLength(usize),
    /// The payload contains a byte outside the hex alphabet.
    NonHexByte { index: usize, byte: u8 },
}

impl Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::WrongLength(len) => {
                write!(f, "frame must be 6 characters, got {}", len)
            }
            FrameError::NonHexByte { index, byte } => {
                write!(
                    f,
                    "non-hex byte 0x{:02X} at position {} in frame",
                    byte, index
                )
            }
        }
    }
}

impl Error for FrameError {}
