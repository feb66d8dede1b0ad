//! Transport state of one driver session: the socket, its timeouts, and
//! the frame exchange primitive.

use std::{
    io::{ErrorKind, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use hexreg_protocol::{Frame, EXIT_TOKEN, GREETING};

use crate::error::{DriverError, Result};

/// Largest response accepted in a single receive.
const RECV_BUFFER_SIZE: usize = 256;

/// An established connection to a device.
///
/// Frames travel strictly request-then-response on this stream; the owning
/// [`Driver`](crate::Driver) serializes callers, so `exchange` never
/// interleaves.
pub(crate) struct Connection {
    stream: TcpStream,
}

impl Connection {
    /// Dials the device and performs the greeting handshake.
    ///
    /// The configured timeout bounds the TCP connect, the greeting read,
    /// and every later send and receive. Any failure before the greeting
    /// has been verified is a connection failure.
    pub(crate) fn open(host: &str, port: u16, timeout: Duration) -> Result<Connection> {
        let addrs = (host, port).to_socket_addrs().map_err(|error| {
            DriverError::ConnectionFailed(format!("cannot resolve {}:{}: {}", host, port, error))
        })?;

        let mut last_error = None;
        let mut connected = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(error) => last_error = Some(error),
            }
        }
        let stream = connected.ok_or_else(|| {
            DriverError::ConnectionFailed(match last_error {
                Some(error) => format!("cannot connect to {}:{}: {}", host, port, error),
                None => format!("{}:{} resolved to no addresses", host, port),
            })
        })?;

        let mut connection = Connection { stream };
        connection.set_timeout(timeout)?;

        let mut greeting = [0u8; 3];
        connection.stream.read_exact(&mut greeting).map_err(|error| {
            DriverError::ConnectionFailed(format!("no greeting from device: {}", error))
        })?;
        if greeting != GREETING {
            return Err(DriverError::ConnectionFailed(format!(
                "unexpected greeting {:?}",
                String::from_utf8_lossy(&greeting)
            )));
        }

        Ok(connection)
    }

    /// Applies a send and receive timeout to the underlying socket.
    pub(crate) fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.stream
            .set_read_timeout(Some(timeout))
            .and_then(|()| self.stream.set_write_timeout(Some(timeout)))
            .map_err(map_io)
    }

    /// Sends one frame and receives the device's response frame.
    pub(crate) fn exchange(&mut self, request: &Frame) -> Result<Frame> {
        let wire = request.encode();
        log::trace!("sending frame {}", wire);
        self.stream.write_all(wire.as_bytes()).map_err(map_io)?;

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let received = self.stream.read(&mut buffer).map_err(map_io)?;
        if received == 0 {
            return Err(DriverError::CommunicationFailed(
                "device closed the connection".into(),
            ));
        }

        let payload = &buffer[..received];
        let response = Frame::parse(payload).map_err(|error| {
            DriverError::Protocol(format!(
                "unparseable response {:?}: {}",
                String::from_utf8_lossy(payload),
                error
            ))
        })?;
        log::trace!("received frame {}", response);
        Ok(response)
    }

    /// Requests a graceful close and drops the socket. Best effort; the
    /// session ends disconnected regardless.
    pub(crate) fn close(mut self) {
        let _ = self.stream.write_all(EXIT_TOKEN);
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

fn map_io(error: std::io::Error) -> DriverError {
    match error.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => DriverError::Timeout,
        _ => DriverError::CommunicationFailed(error.to_string()),
    }
}
