//! Sensor simulation: a bounded random walk advanced once per command.

use rand::{rngs::StdRng, Rng, SeedableRng};

use hexreg_protocol::registers::Component;

use crate::memory::DeviceMemory;

/// Denominator of the per-tick error probability (one in a hundred).
const ERROR_ODDS: u32 = 100;

/// Random-walk state for the two sensors.
///
/// Readings drift under actuator influence: the heater pushes the
/// temperature up, the fan cools and dries. A powered-down sensor is
/// frozen entirely; its reading does not move and its error bit cannot
/// be raised.
pub struct SensorSim {
    rng: StdRng,
}

impl SensorSim {
    pub fn from_entropy() -> SensorSim {
        SensorSim {
            rng: StdRng::from_entropy(),
        }
    }

    /// A deterministic walk for reproducible runs and tests.
    pub fn with_seed(seed: u64) -> SensorSim {
        SensorSim {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws an initial reading for a sensor.
    pub fn initial_reading(&mut self) -> u8 {
        self.rng.gen()
    }

    /// Advances both sensors by one tick, gated on their power bits.
    pub fn advance(&mut self, memory: &mut DeviceMemory) {
        if memory.power & Component::Temperature.status_mask() != 0 {
            let drift = i16::from(memory.heater) / 4 - i16::from(memory.fan) / 64;
            memory.temp_value = self.step(memory.temp_value, drift);
            if self.roll_error() {
                memory.errors |= Component::Temperature.status_mask();
            }
        }

        if memory.power & Component::Humidity.status_mask() != 0 {
            let drift = -(i16::from(memory.fan) / 64);
            memory.humid_value = self.step(memory.humid_value, drift);
            if self.roll_error() {
                memory.errors |= Component::Humidity.status_mask();
            }
        }
    }

    fn step(&mut self, value: u8, drift: i16) -> u8 {
        let jitter = self.rng.gen_range(-3_i16..=3);
        (i16::from(value) + jitter + drift).clamp(0, 255) as u8
    }

    fn roll_error(&mut self) -> bool {
        self.rng.gen_range(0..ERROR_ODDS) == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn powered_down_sensors_are_frozen() {
        let mut sim = SensorSim::with_seed(7);
        let mut memory = DeviceMemory::new(0x42, 0x24);
        memory.power = 0x00;

        for _ in 0..256 {
            sim.advance(&mut memory);
        }
        assert_eq!(memory.temp_value, 0x42);
        assert_eq!(memory.humid_value, 0x24);
        assert_eq!(memory.errors, 0x00);
    }

    #[test]
    fn powered_sensors_move() {
        let mut sim = SensorSim::with_seed(7);
        let mut memory = DeviceMemory::new(0x80, 0x80);

        let mut temp_moved = false;
        let mut humid_moved = false;
        for _ in 0..64 {
            sim.advance(&mut memory);
            temp_moved |= memory.temp_value != 0x80;
            humid_moved |= memory.humid_value != 0x80;
        }
        assert!(temp_moved);
        assert!(humid_moved);
    }

    #[test]
    fn heater_drives_temperature_up() {
        let mut sim = SensorSim::with_seed(7);
        let mut memory = DeviceMemory::new(0x10, 0x80);
        memory.heater = 0x0F;

        for _ in 0..256 {
            sim.advance(&mut memory);
        }
        assert!(memory.temp_value > 0x10);
    }

    #[test]
    fn fan_drives_humidity_down() {
        let mut sim = SensorSim::with_seed(7);
        let mut memory = DeviceMemory::new(0x80, 0xF0);
        memory.fan = 0xFF;

        for _ in 0..256 {
            sim.advance(&mut memory);
        }
        assert!(memory.humid_value < 0xF0);
    }

    #[test]
    fn errors_are_eventually_raised_while_powered() {
        let mut sim = SensorSim::with_seed(7);
        let mut memory = DeviceMemory::new(0x80, 0x80);

        for _ in 0..10_000 {
            sim.advance(&mut memory);
        }
        assert_eq!(memory.errors & 0x05, 0x05);
    }

    #[test]
    fn reading_stays_in_byte_range_at_the_rails() {
        let mut sim = SensorSim::with_seed(7);
        let mut memory = DeviceMemory::new(0xFF, 0x00);
        memory.heater = 0x0F;
        memory.fan = 0xFF;

        for _ in 0..512 {
            sim.advance(&mut memory);
        }
        // Nothing to assert beyond not panicking on overflow; the clamp
        // keeps both walks inside the byte range.
    }
}
