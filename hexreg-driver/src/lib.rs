//! # hexreg Driver
//!
//! A client library for hexreg devices. It owns one TCP session per
//! [`Driver`] value and translates high-level component operations (read a
//! sensor, set an actuator, switch power, reset a subsystem) into the
//! frame protocol of the
//! [`hexreg_protocol`](https://docs.rs/hexreg-protocol/) crate.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use hexreg_driver::{Driver, DoorId, DoorState};
//! use hexreg_protocol::registers::Component;
//!
//! let driver = Driver::new();
//! driver.connect("localhost", 8989)?;
//!
//! let status = driver.status()?;
//! println!("sensors powered: {}", status.sensors_powered);
//!
//! driver.set_led(0x80)?;
//! driver.set_door(DoorId::Two, DoorState::Open)?;
//! let temperature = driver.temperature()?;
//!
//! driver.set_power_state(Component::Heater, false)?;
//! driver.disconnect()?;
//! ```
//!
//! ## Session Model
//!
//! Each `Driver` is an independent session: its socket, timeout and
//! last-error slot live behind one internal lock, so a `Driver` may be
//! shared across threads and calls are serialized. There is no global
//! state; any number of drivers can coexist in one process.
//!
//! Dropping a connected driver sends the device the `exit` token and
//! closes the socket.
//!
//! ## Safety Properties
//!
//! Every register write is verified against the device's echo, and the
//! door setter additionally reads the register back to confirm the latch
//! took the commanded state. Registers with reserved bits (heater, doors)
//! are updated with read-modify-write so reserved bits are never invented
//! by the driver.
//!
//! ## Errors
//!
//! All operations return [`error::DriverError`]. The most recent failure
//! is also kept in the session and can be fetched with
//! [`Driver::last_error`] after the fact.

pub mod error;
mod registers;
mod session;

use std::fmt::Display;
use std::sync::Mutex;
use std::time::Duration;

use hexreg_protocol::registers::{masks, offsets, Base, Component};
use hexreg_protocol::Frame;

pub use error::{DriverError, Result};

use session::Connection;

/// Host the driver dials when none is given.
pub const DEFAULT_HOST: &str = "localhost";
/// Port the driver dials when none is given.
pub const DEFAULT_PORT: u16 = 8989;
/// Send/receive timeout applied to new sessions.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Summary of the device's MAIN status registers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceStatus {
    /// At least one component reports present.
    pub connected: bool,
    /// At least one sensor is powered.
    pub sensors_powered: bool,
    /// At least one actuator is powered.
    pub actuators_powered: bool,
    /// At least one component has a latched error.
    pub has_errors: bool,
}

/// One of the four door latches.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DoorId {
    One,
    Two,
    Three,
    Four,
}

impl DoorId {
    pub const ALL: [DoorId; 4] = [DoorId::One, DoorId::Two, DoorId::Three, DoorId::Four];

    /// Maps a 1-based door number to its id.
    pub fn from_number(number: u8) -> Option<DoorId> {
        match number {
            1 => Some(DoorId::One),
            2 => Some(DoorId::Two),
            3 => Some(DoorId::Three),
            4 => Some(DoorId::Four),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            DoorId::One => 1,
            DoorId::Two => 2,
            DoorId::Three => 3,
            DoorId::Four => 4,
        }
    }

    /// Door `n` occupies bit `2 * (n - 1)` of the doors register.
    fn mask(self) -> u8 {
        1 << (2 * (self.number() - 1))
    }
}

impl Display for DoorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// State of a door latch.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DoorState {
    Open,
    Closed,
}

/// The most recent failure recorded in a session.
#[derive(Clone, Debug)]
pub struct LastError {
    /// Stable numeric code, see [`DriverError::code`].
    pub code: u8,
    /// Human-readable description.
    pub message: String,
}

struct Inner {
    connection: Option<Connection>,
    timeout: Duration,
    last_error: Option<LastError>,
}

/// A driver session.
///
/// See the [crate documentation](crate) for the session model. All methods
/// take `&self`; an internal lock serializes concurrent callers.
pub struct Driver {
    inner: Mutex<Inner>,
}

impl Driver {
    /// Creates a disconnected session with the default timeout.
    pub fn new() -> Driver {
        Driver {
            inner: Mutex::new(Inner {
                connection: None,
                timeout: DEFAULT_TIMEOUT,
                last_error: None,
            }),
        }
    }

    /// Opens the session: TCP connect plus the `ACK` greeting handshake.
    pub fn connect(&self, host: &str, port: u16) -> Result<()> {
        self.run(|inner| {
            if inner.connection.is_some() {
                return Err(DriverError::AlreadyConnected);
            }
            let connection = Connection::open(host, port, inner.timeout)?;
            inner.connection = Some(connection);
            log::info!("connected to device at {}:{}", host, port);
            Ok(())
        })
    }

    /// Closes the session, sending the `exit` token first. The session is
    /// left disconnected even if it already was.
    pub fn disconnect(&self) -> Result<()> {
        self.run(|inner| {
            if let Some(connection) = inner.connection.take() {
                connection.close();
                log::info!("disconnected from device");
            }
            Ok(())
        })
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connection.is_some()
    }

    /// Reconfigures the send/receive timeout, applying it to the open
    /// socket if the session is connected.
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        self.run(|inner| {
            if timeout.is_zero() {
                return Err(DriverError::InvalidParameter(
                    "timeout must be non-zero".into(),
                ));
            }
            inner.timeout = timeout;
            if let Some(connection) = inner.connection.as_mut() {
                connection.set_timeout(timeout)?;
            }
            Ok(())
        })
    }

    /// Reads the three MAIN status registers into a summary.
    pub fn status(&self) -> Result<DeviceStatus> {
        self.with_connection(|connection| {
            let connected = registers::read_register(connection, Base::Main, offsets::CONNECTED)?;
            let power = registers::read_register(connection, Base::Main, offsets::POWER)?;
            let errors = registers::read_register(connection, Base::Main, offsets::ERRORS)?;
            Ok(DeviceStatus {
                connected: connected != 0,
                sensors_powered: power & masks::STATUS_SENSORS != 0,
                actuators_powered: power & masks::STATUS_ACTUATORS != 0,
                has_errors: errors != 0,
            })
        })
    }

    /// Current temperature reading.
    pub fn temperature(&self) -> Result<u8> {
        self.with_connection(|connection| {
            registers::read_register(connection, Base::Sensor, offsets::TEMP_VALUE)
        })
    }

    /// Current humidity reading.
    pub fn humidity(&self) -> Result<u8> {
        self.with_connection(|connection| {
            registers::read_register(connection, Base::Sensor, offsets::HUMID_VALUE)
        })
    }

    /// Identity byte of a sensor.
    pub fn sensor_id(&self, component: Component) -> Result<u8> {
        let offset = match component {
            Component::Temperature => offsets::TEMP_ID,
            Component::Humidity => offsets::HUMID_ID,
            other => {
                return self.fail(DriverError::InvalidParameter(format!(
                    "{} has no sensor identity",
                    other
                )));
            }
        };
        self.with_connection(|connection| {
            registers::read_register(connection, Base::Sensor, offset)
        })
    }

    pub fn led(&self) -> Result<u8> {
        self.with_connection(|connection| {
            registers::read_register(connection, Base::Actuator, offsets::LED)
        })
    }

    pub fn set_led(&self, value: u8) -> Result<()> {
        self.with_connection(|connection| {
            registers::write_register(connection, Base::Actuator, offsets::LED, value)
        })
    }

    pub fn fan(&self) -> Result<u8> {
        self.with_connection(|connection| {
            registers::read_register(connection, Base::Actuator, offsets::FAN)
        })
    }

    pub fn set_fan(&self, value: u8) -> Result<()> {
        self.with_connection(|connection| {
            registers::write_register(connection, Base::Actuator, offsets::FAN, value)
        })
    }

    /// Heater level, 0..=15.
    pub fn heater(&self) -> Result<u8> {
        self.with_connection(|connection| {
            let raw = registers::read_register(connection, Base::Actuator, offsets::HEATER)?;
            Ok(raw & masks::HEATER_WRITE)
        })
    }

    /// Sets the heater level. Only the low nibble of `value` is used; the
    /// reserved high nibble is read first and written back unchanged.
    pub fn set_heater(&self, value: u8) -> Result<()> {
        self.with_connection(|connection| {
            let current = registers::read_register(connection, Base::Actuator, offsets::HEATER)?;
            let next = (current & !masks::HEATER_WRITE) | (value & masks::HEATER_WRITE);
            registers::write_register(connection, Base::Actuator, offsets::HEATER, next)
        })
    }

    /// Current state of one door, read fresh from the device.
    pub fn door_state(&self, door: DoorId) -> Result<DoorState> {
        self.with_connection(|connection| {
            let doors = registers::read_register(connection, Base::Actuator, offsets::DOORS)?;
            Ok(if doors & door.mask() != 0 {
                DoorState::Open
            } else {
                DoorState::Closed
            })
        })
    }

    /// Commands one door and verifies the latch took the state.
    ///
    /// Read-modify-write leaves the other doors untouched; a final
    /// read-back confirms the commanded bit. A mismatch on the read-back
    /// is reported as a device error.
    pub fn set_door(&self, door: DoorId, state: DoorState) -> Result<()> {
        self.with_connection(|connection| {
            let current = registers::read_register(connection, Base::Actuator, offsets::DOORS)?;
            let target = match state {
                DoorState::Open => current | door.mask(),
                DoorState::Closed => current & !door.mask(),
            };
            registers::write_register(
                connection,
                Base::Actuator,
                offsets::DOORS,
                target & masks::DOORS_WRITE,
            )?;

            let observed = registers::read_register(connection, Base::Actuator, offsets::DOORS)?;
            let open = observed & door.mask() != 0;
            if open != (state == DoorState::Open) {
                return Err(DriverError::Device(format!(
                    "door {} verification failed: commanded {:?}, register reads {:#04X}",
                    door, state, observed
                )));
            }
            Ok(())
        })
    }

    /// Whether a component is currently powered.
    pub fn power_state(&self, component: Component) -> Result<bool> {
        self.with_connection(|connection| {
            let power = registers::read_register(connection, Base::Main, offsets::POWER)?;
            Ok(power & component.status_mask() != 0)
        })
    }

    /// Powers one component on or off, preserving the other components in
    /// the same control register.
    pub fn set_power_state(&self, component: Component, on: bool) -> Result<()> {
        self.with_connection(|connection| {
            let offset = component.power_offset();
            let write_mask = if component.is_sensor() {
                masks::POWER_SENSORS_WRITE
            } else {
                masks::POWER_ACTUATORS_WRITE
            };
            let current = registers::read_register(connection, Base::Control, offset)?;
            let next = if on {
                current | component.control_mask()
            } else {
                current & !component.control_mask()
            };
            registers::write_register(connection, Base::Control, offset, next & write_mask)
        })
    }

    /// Whether a component has a latched error.
    pub fn error_state(&self, component: Component) -> Result<bool> {
        self.with_connection(|connection| {
            let errors = registers::read_register(connection, Base::Main, offsets::ERRORS)?;
            Ok(errors & component.status_mask() != 0)
        })
    }

    /// Resets one component. Reads the strobe register, then writes it
    /// back with only the target bit set; the device auto-clears the bit
    /// once the reset applies, so the request is single-shot.
    pub fn reset_component(&self, component: Component) -> Result<()> {
        self.with_connection(|connection| {
            let offset = component.reset_offset();
            registers::read_register(connection, Base::Control, offset)?;
            registers::write_register(connection, Base::Control, offset, component.control_mask())
        })
    }

    /// Exchanges a caller-supplied frame verbatim and returns the response
    /// frame. Intended for tests and diagnostics; no access checks apply.
    pub fn send_raw(&self, frame: &str) -> Result<String> {
        self.with_connection(|connection| {
            let request = Frame::parse(frame.as_bytes()).map_err(|error| {
                DriverError::InvalidParameter(format!("bad frame {:?}: {}", frame, error))
            })?;
            let response = connection.exchange(&request)?;
            Ok(response.encode())
        })
    }

    /// The most recent failure recorded by any operation on this session.
    pub fn last_error(&self) -> Option<LastError> {
        self.lock().last_error.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs one operation under the session lock, recording any failure in
    /// the last-error slot.
    fn run<T>(&self, operation: impl FnOnce(&mut Inner) -> Result<T>) -> Result<T> {
        let mut inner = self.lock();
        let result = operation(&mut inner);
        if let Err(error) = &result {
            log::warn!("driver operation failed: {}", error);
            inner.last_error = Some(LastError {
                code: error.code(),
                message: error.to_string(),
            });
        }
        result
    }

    fn with_connection<T>(&self, operation: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        self.run(|inner| {
            let connection = inner.connection.as_mut().ok_or(DriverError::NotConnected)?;
            operation(connection)
        })
    }

    /// Records and returns an error raised before any I/O took place.
    fn fail<T>(&self, error: DriverError) -> Result<T> {
        self.run(|_| Err(error))
    }
}

impl Default for Driver {
    fn default() -> Driver {
        Driver::new()
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(connection) = inner.connection.take() {
            connection.close();
        }
    }
}
