/// Parse and encode implementations for protocol frames
use std::fmt::Display;
use std::str::FromStr;

use crate::{
    error::FrameError,
    protocol::{Command, Fault, Frame, FRAME_LEN},
};

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

impl Frame {
    /// Parses a received payload into a frame.
    ///
    /// Succeeds only if the payload is exactly [`FRAME_LEN`] bytes of the
    /// hex alphabet (either case). A payload whose leading nibble is a
    /// fault code and whose remaining five characters are all `F` is
    /// recognized as a fault response; everything else is a command.
    pub fn parse(payload: &[u8]) -> Result<Frame, FrameError> {
        if payload.len() != FRAME_LEN {
            return Err(FrameError::WrongLength(payload.len()));
        }

        let mut nibbles = [0u8; FRAME_LEN];
        for (index, &byte) in payload.iter().enumerate() {
            nibbles[index] = hex_value(byte).ok_or(FrameError::NonHexByte { index, byte })?;
        }

        if let Some(fault) = Fault::from_code(nibbles[0]) {
            if nibbles[1..].iter().all(|&nibble| nibble == 0xF) {
                return Ok(Frame::Fault(fault));
            }
        }

        Ok(Frame::Command(Command {
            base: nibbles[0],
            offset: nibbles[1] << 4 | nibbles[2],
            rw: nibbles[3],
            data: nibbles[4] << 4 | nibbles[5],
        }))
    }

    /// Encodes the frame as its six-character wire representation.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frame::Command(command) => write!(
                f,
                "{:1X}{:02X}{:1X}{:02X}",
                command.base, command.offset, command.rw, command.data
            ),
            Frame::Fault(fault) => write!(f, "{:1X}FFFFF", fault.code()),
        }
    }
}

impl FromStr for Frame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Frame, FrameError> {
        Frame::parse(s.as_bytes())
    }
}

#[cfg(test)]
mod test {
    use crate::error::FrameError;
    use crate::protocol::{Command, Fault, Frame};

    #[test]
    fn parse_read_command() {
        match Frame::parse(b"102000").unwrap() {
            Frame::Command(command) => {
                assert_eq!(command.base, 0x1);
                assert_eq!(command.offset, 0x02);
                assert_eq!(command.rw, 0x0);
                assert_eq!(command.data, 0x00);
            }
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn parse_write_command() {
        match Frame::parse(b"340155").unwrap() {
            Frame::Command(command) => {
                assert_eq!(command.base, 0x3);
                assert_eq!(command.offset, 0x40);
                assert_eq!(command.rw, 0x1);
                assert_eq!(command.data, 0x55);
            }
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn parse_accepts_lowercase() {
        assert_eq!(
            Frame::parse(b"4fb1ff").unwrap(),
            Frame::write(0x4, 0xFB, 0xFF)
        );
    }

    #[test]
    fn parse_fault_frames() {
        assert_eq!(Frame::parse(b"1FFFFF"), Ok(Frame::Fault(Fault::Forbidden)));
        assert_eq!(Frame::parse(b"2FFFFF"), Ok(Frame::Fault(Fault::Invalid)));
        assert_eq!(Frame::parse(b"3FFFFF"), Ok(Frame::Fault(Fault::General)));
        assert_eq!(Frame::parse(b"2fffff"), Ok(Frame::Fault(Fault::Invalid)));
    }

    #[test]
    fn all_f_payload_with_nominal_base_is_a_command() {
        // 4FFFFF starts with a non-fault nibble, so it stays a command.
        match Frame::parse(b"4FFFFF").unwrap() {
            Frame::Command(command) => assert_eq!(command.rw, 0xF),
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(Frame::parse(b"10200"), Err(FrameError::WrongLength(5)));
        assert_eq!(Frame::parse(b"1020000"), Err(FrameError::WrongLength(7)));
        assert_eq!(Frame::parse(b""), Err(FrameError::WrongLength(0)));
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert_eq!(
            Frame::parse(b"10200G"),
            Err(FrameError::NonHexByte {
                index: 5,
                byte: b'G'
            })
        );
        assert_eq!(
            Frame::parse(b"exit\0\0"),
            Err(FrameError::NonHexByte {
                index: 1,
                byte: b'x'
            })
        );
    }

    #[test]
    fn encode_command() {
        assert_eq!(Frame::read(0x1, 0x02).encode(), "102000");
        assert_eq!(Frame::write(0x3, 0x10, 0x80).encode(), "310180");
        assert_eq!(Frame::write(0x4, 0xFB, 0x11).encode(), "4FB111");
    }

    #[test]
    fn encode_fault() {
        assert_eq!(Frame::fault(Fault::Forbidden).encode(), "1FFFFF");
        assert_eq!(Frame::fault(Fault::Invalid).encode(), "2FFFFF");
        assert_eq!(Frame::fault(Fault::General).encode(), "3FFFFF");
    }

    #[test]
    fn round_trip_all_well_formed_commands() {
        for base in 0..=0xF_u8 {
            let command = Command {
                base,
                offset: 0xA7,
                rw: 0x1,
                data: 0x5C,
            };
            let frame = Frame::Command(command);
            assert_eq!(Frame::parse(frame.encode().as_bytes()), Ok(frame));
        }
    }

    #[test]
    fn round_trip_via_from_str() {
        let frame: Frame = "310180".parse().unwrap();
        assert_eq!(frame, Frame::write(0x3, 0x10, 0x80));
    }
}
