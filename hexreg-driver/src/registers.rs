//! Register-level access: local permission checks, the read and write
//! primitives, and write-echo verification.

use hexreg_protocol::registers::{lookup, Access, Base};
use hexreg_protocol::{Command, Frame, RW_READ, RW_WRITE};

use crate::error::{DriverError, Result};
use crate::session::Connection;

/// Rejects accesses the device is certain to fault on, without spending a
/// round trip. Mirrors the device's own access rules; the caller sees an
/// invalid-parameter error instead of a device fault.
pub(crate) fn check_access(base: Base, offset: u8, write: bool) -> Result<()> {
    if base == Base::Reserved {
        return Err(DriverError::InvalidParameter(
            "the reserved address space is not accessible".into(),
        ));
    }
    let spec = lookup(base, offset).ok_or_else(|| {
        DriverError::InvalidParameter(format!("no register at {}[{:#04X}]", base, offset))
    })?;
    if write && spec.access == Access::ReadOnly {
        return Err(DriverError::InvalidParameter(format!(
            "register {} ({}[{:#04X}]) is read-only",
            spec.name, base, offset
        )));
    }
    Ok(())
}

/// Reads one register and returns its value.
pub(crate) fn read_register(connection: &mut Connection, base: Base, offset: u8) -> Result<u8> {
    check_access(base, offset, false)?;

    let request = Command::read(base.nibble(), offset);
    let response = match connection.exchange(&Frame::Command(request))? {
        Frame::Fault(fault) => {
            return Err(DriverError::Device(format!(
                "device answered {} reading {}[{:#04X}]",
                fault, base, offset
            )));
        }
        Frame::Command(response) => response,
    };

    if response.base != request.base || response.offset != request.offset || response.rw != RW_READ
    {
        return Err(DriverError::Protocol(format!(
            "response {} does not match read of {}[{:#04X}]",
            Frame::Command(response),
            base,
            offset
        )));
    }
    Ok(response.data)
}

/// Writes one register and verifies the device's echo.
///
/// An accepted write is echoed back verbatim; any difference in base,
/// offset, direction or data means the register did not take the value and
/// is reported as a device error.
pub(crate) fn write_register(
    connection: &mut Connection,
    base: Base,
    offset: u8,
    value: u8,
) -> Result<()> {
    check_access(base, offset, true)?;

    let request = Command::write(base.nibble(), offset, value);
    let response = match connection.exchange(&Frame::Command(request))? {
        Frame::Fault(fault) => {
            return Err(DriverError::Device(format!(
                "device answered {} writing {:#04X} to {}[{:#04X}]",
                fault, value, base, offset
            )));
        }
        Frame::Command(response) => response,
    };

    if response.base != request.base
        || response.offset != request.offset
        || response.rw != RW_WRITE
        || response.data != request.data
    {
        return Err(DriverError::Device(format!(
            "write verification failed for {}[{:#04X}]: sent {}, device echoed {}",
            base,
            offset,
            Frame::Command(request),
            Frame::Command(response)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use hexreg_protocol::registers::offsets;

    #[test]
    fn reserved_base_is_rejected_locally() {
        let error = check_access(Base::Reserved, 0x00, false).unwrap_err();
        assert!(matches!(error, DriverError::InvalidParameter(_)));
    }

    #[test]
    fn read_only_bases_reject_writes_locally() {
        assert!(check_access(Base::Main, offsets::POWER, false).is_ok());
        let error = check_access(Base::Main, offsets::POWER, true).unwrap_err();
        assert!(matches!(error, DriverError::InvalidParameter(_)));
        let error = check_access(Base::Sensor, offsets::TEMP_VALUE, true).unwrap_err();
        assert!(matches!(error, DriverError::InvalidParameter(_)));
    }

    #[test]
    fn unknown_offsets_are_rejected_locally() {
        let error = check_access(Base::Control, 0xFA, false).unwrap_err();
        assert!(matches!(error, DriverError::InvalidParameter(_)));
        let error = check_access(Base::Actuator, 0x50, true).unwrap_err();
        assert!(matches!(error, DriverError::InvalidParameter(_)));
    }

    #[test]
    fn writable_registers_pass_the_check() {
        assert!(check_access(Base::Actuator, offsets::LED, true).is_ok());
        assert!(check_access(Base::Actuator, offsets::DOORS, true).is_ok());
        assert!(check_access(Base::Control, offsets::POWER_SENSORS, true).is_ok());
        assert!(check_access(Base::Control, offsets::RESET_ACTUATORS, true).is_ok());
    }
}
