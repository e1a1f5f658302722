//! In-memory mirror of the expander's per-port registers and the mapping from
//! [`LogicalPin`] values to register bits.
//!
//! Every register write sends a whole byte, so a new register value is always
//! derived from the cached value of that same register. Values are staged on a
//! copy and only committed after the bus acknowledged the write.
use crate::error::{Error, Operation, Result};
use crate::{LogicalPin, PinState, Port, PORT_B_OFFSET};

/// Resolve a pin to its port and single-bit mask.
pub fn bit_for(pin: LogicalPin, op: Operation) -> Result<(Port, u8)> {
    let value = pin.value();
    let (port, weight) = if value >= PORT_B_OFFSET {
        (Port::B, value - PORT_B_OFFSET)
    } else {
        (Port::A, value)
    };
    match u8::try_from(weight) {
        Ok(mask) if mask.is_power_of_two() => Ok((port, mask)),
        _ => Err(Error::InvalidPin { op }),
    }
}

/// Set or clear the bits in `mask`, leaving the others untouched.
pub const fn apply_bit(word: u8, mask: u8, level: PinState) -> u8 {
    match level {
        PinState::High => word | mask,
        PinState::Low => word & !mask,
    }
}

pub const fn bit_level(word: u8, mask: u8) -> PinState {
    if word & mask != 0 {
        PinState::High
    } else {
        PinState::Low
    }
}

/// Cached register words of one port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortRegisters {
    /// IODIR: 1=input, 0=output
    pub direction: u8,
    /// GPPU: 1=pull-up enabled
    pub pull_up: u8,
    /// GPINTEN, kept equal to `direction`
    pub interrupt_enable: u8,
    /// OLAT as last written
    pub output_latch: u8,
    /// GPIO as last observed
    pub gpio: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortStateCache {
    ports: [PortRegisters; 2],
}

impl PortStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(&self, port: Port) -> &PortRegisters {
        &self.ports[port.index()]
    }

    pub fn port_mut(&mut self, port: Port) -> &mut PortRegisters {
        &mut self.ports[port.index()]
    }

    /// True if any pin on either port is configured as an input.
    pub fn has_inputs(&self) -> bool {
        self.ports.iter().any(|p| p.direction != 0)
    }

    pub fn is_input(&self, port: Port, mask: u8) -> bool {
        self.port(port).direction & mask != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board;

    const OP: Operation = Operation::Init;

    #[test]
    fn port_a_pins() {
        assert_eq!(bit_for(board::GPA0, OP), Ok((Port::A, 0x01)));
        assert_eq!(bit_for(board::GPA2, OP), Ok((Port::A, 0x04)));
        assert_eq!(bit_for(board::GPA7, OP), Ok((Port::A, 0x80)));
    }

    #[test]
    fn port_b_pins() {
        assert_eq!(bit_for(board::GPB0, OP), Ok((Port::B, 0x01)));
        assert_eq!(bit_for(board::GPB7, OP), Ok((Port::B, 0x80)));
        assert_eq!(bit_for(LogicalPin::new(1016, "b4"), OP), Ok((Port::B, 0x10)));
    }

    #[test]
    fn invalid_pins() {
        for value in [0, 3, 129, 256, 999, 1000, 1003, 1256, u16::MAX] {
            let pin = LogicalPin::new(value, "bogus");
            assert_eq!(
                bit_for(pin, Operation::Write(pin)),
                Err(Error::InvalidPin {
                    op: Operation::Write(pin)
                }),
                "value {value}"
            );
        }
    }

    #[test]
    fn apply_bit_touches_one_bit() {
        for word in [0x00u8, 0xff, 0xa5, 0x5a] {
            for bit in 0..8 {
                let mask = 1 << bit;
                let high = apply_bit(word, mask, PinState::High);
                let low = apply_bit(word, mask, PinState::Low);
                assert_eq!(high & !mask, word & !mask);
                assert_eq!(low & !mask, word & !mask);
                assert_eq!(bit_level(high, mask), PinState::High);
                assert_eq!(bit_level(low, mask), PinState::Low);
            }
        }
    }

    #[test]
    fn has_inputs() {
        let mut cache = PortStateCache::new();
        assert!(!cache.has_inputs());
        cache.port_mut(Port::B).direction = 0x10;
        assert!(cache.has_inputs());
        assert!(cache.is_input(Port::B, 0x10));
        assert!(!cache.is_input(Port::A, 0x10));
    }
}
