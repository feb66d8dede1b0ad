//! The command interpreter: payload in, response frame out.

use std::sync::Mutex;

use hexreg_protocol::registers::Base;
use hexreg_protocol::{Command, Fault, Frame, RW_READ, RW_WRITE};

use crate::memory::DeviceMemory;
use crate::sim::SensorSim;

struct State {
    memory: DeviceMemory,
    sim: SensorSim,
}

/// Owns the register block and serializes all access to it.
///
/// Exactly one command executes to completion before the next begins; the
/// sensor tick for a command runs under the same lock at the tail of its
/// dispatch. The engine is shared between the server thread and any test
/// hooks through an `Arc`.
pub struct Engine {
    state: Mutex<State>,
}

impl Engine {
    /// An engine with an entropy-seeded sensor walk.
    pub fn new() -> Engine {
        Engine::with_sim(SensorSim::from_entropy())
    }

    /// An engine with a deterministic sensor walk.
    pub fn with_seed(seed: u64) -> Engine {
        Engine::with_sim(SensorSim::with_seed(seed))
    }

    fn with_sim(mut sim: SensorSim) -> Engine {
        let temp = sim.initial_reading();
        let humid = sim.initial_reading();
        Engine {
            state: Mutex::new(State {
                memory: DeviceMemory::new(temp, humid),
                sim,
            }),
        }
    }

    /// Interprets one received payload and returns the response frame.
    ///
    /// Anything that is not six hex characters is answered with a
    /// forbidden fault; a well-formed frame whose read/write nibble is
    /// outside {0, 1} (which includes received fault frames, whose rw
    /// nibble is F) is answered with an invalid fault. Neither advances
    /// the sensors. Every payload that reaches register dispatch, whether
    /// it succeeds or faults there, is followed by one sensor tick.
    pub fn process(&self, payload: &[u8]) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let response = match Frame::parse(payload) {
            Err(error) => {
                log::debug!("rejecting malformed payload: {}", error);
                Frame::fault(Fault::Forbidden)
            }
            Ok(Frame::Fault(_)) => Frame::fault(Fault::Invalid),
            Ok(Frame::Command(command)) if command.rw != RW_READ && command.rw != RW_WRITE => {
                Frame::fault(Fault::Invalid)
            }
            Ok(Frame::Command(command)) => {
                let response = dispatch(&mut state.memory, command);
                let State { memory, sim } = &mut *state;
                sim.advance(memory);
                response
            }
        };

        log::trace!("response frame {}", response);
        response.encode()
    }

    /// String-typed convenience over [`Engine::process`] for transportless
    /// callers such as tests.
    pub fn process_command(&self, command: &str) -> String {
        self.process(command.as_bytes())
    }

    /// Copies out the current register block.
    pub fn snapshot(&self) -> DeviceMemory {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).memory
    }

    /// Replaces the register block wholesale. Test hook.
    pub fn restore(&self, memory: DeviceMemory) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).memory = memory;
    }
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::new()
    }
}

fn dispatch(memory: &mut DeviceMemory, command: Command) -> Frame {
    let Some(base) = Base::from_nibble(command.base) else {
        return Frame::fault(Fault::Invalid);
    };

    log::trace!(
        "dispatching {} {}[{:#04X}]",
        if command.is_read() { "read" } else { "write" },
        base,
        command.offset
    );

    match base {
        Base::Reserved => Frame::fault(Fault::Forbidden),
        Base::Main | Base::Sensor => {
            if command.is_write() {
                return Frame::fault(Fault::Forbidden);
            }
            read_response(memory, base, command)
        }
        Base::Actuator | Base::Control => {
            if command.is_read() {
                read_response(memory, base, command)
            } else if memory.write(base, command.offset, command.data) {
                // Accepted writes echo the request verbatim, pre-mask data
                // byte included; the driver verifies against this echo.
                Frame::Command(command)
            } else {
                Frame::fault(Fault::Invalid)
            }
        }
    }
}

fn read_response(memory: &DeviceMemory, base: Base, command: Command) -> Frame {
    match memory.read(base, command.offset) {
        Some(value) => Frame::Command(Command {
            data: value,
            ..command
        }),
        None => Frame::fault(Fault::Invalid),
    }
}
