//! Mode 2 interrupt daisy chain.
//!
//! Z80-family peripherals are wired in a priority chain. Each device sees
//! IEIO from the device above it and passes it on to the device below. A
//! device that is requesting or being serviced pulls IEIO low so nothing
//! further down the chain can interrupt. The CPU knows nothing about the
//! chain: it just puts M1|IORQ on the bus for the acknowledge and pulses
//! the virtual RETI line when it decodes `ED 4D`.
//!
//! The host sets IEIO high before ticking the highest-priority device,
//! then threads the pins through every device in priority order.

use crate::Pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntState {
    #[default]
    Idle,
    /// The device wants to interrupt.
    Needed,
    /// INT is asserted, waiting for the acknowledge cycle.
    Requested,
    /// Vector delivered, waiting for RETI.
    Servicing,
}

/// Per-device daisy-chain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DaisyChain {
    state: IntState,
    vector: u8,
}

impl DaisyChain {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: IntState::Idle,
            vector: 0,
        }
    }

    /// Ask for an interrupt with the given mode 2 vector. Ignored while an
    /// earlier interrupt from this device is still in flight.
    pub fn request(&mut self, vector: u8) {
        if self.state == IntState::Idle {
            self.state = IntState::Needed;
            self.vector = vector;
        }
    }

    #[must_use]
    pub const fn state(&self) -> IntState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = IntState::Idle;
    }

    /// Run the chain protocol for this device. Call once per tick, in
    /// priority order, after the CPU has ticked.
    pub fn tick(&mut self, mut pins: Pins) -> Pins {
        if pins.is_set(Pins::IEIO) {
            match self.state {
                IntState::Needed => {
                    pins.set_control(Pins::INT);
                    self.state = IntState::Requested;
                }
                IntState::Requested => {
                    if pins.is_set(Pins::M1 | Pins::IORQ) {
                        pins = pins.with_data(self.vector);
                        self.state = IntState::Servicing;
                    } else {
                        pins.set_control(Pins::INT);
                    }
                }
                IntState::Servicing => {
                    if pins.is_set(Pins::RETI) {
                        self.state = IntState::Idle;
                    }
                }
                IntState::Idle => {}
            }
            if self.state != IntState::Idle {
                pins.clear_control(Pins::IEIO);
            }
        }
        pins
    }
}
