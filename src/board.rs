//! Pin map of the expansion board.
//!
//! `GPAn` / `GPBn` are the expander's port A / port B pins, `n` being the bit
//! position inside the port register.
use crate::{LogicalPin, Port};

pub const GPA0: LogicalPin = LogicalPin::new(Port::A.pin_value(0), "GPA0");
pub const GPA1: LogicalPin = LogicalPin::new(Port::A.pin_value(1), "GPA1");
pub const GPA2: LogicalPin = LogicalPin::new(Port::A.pin_value(2), "GPA2");
pub const GPA3: LogicalPin = LogicalPin::new(Port::A.pin_value(3), "GPA3");
pub const GPA4: LogicalPin = LogicalPin::new(Port::A.pin_value(4), "GPA4");
pub const GPA5: LogicalPin = LogicalPin::new(Port::A.pin_value(5), "GPA5");
pub const GPA6: LogicalPin = LogicalPin::new(Port::A.pin_value(6), "GPA6");
pub const GPA7: LogicalPin = LogicalPin::new(Port::A.pin_value(7), "GPA7");
pub const GPB0: LogicalPin = LogicalPin::new(Port::B.pin_value(0), "GPB0");
pub const GPB1: LogicalPin = LogicalPin::new(Port::B.pin_value(1), "GPB1");
pub const GPB2: LogicalPin = LogicalPin::new(Port::B.pin_value(2), "GPB2");
pub const GPB3: LogicalPin = LogicalPin::new(Port::B.pin_value(3), "GPB3");
pub const GPB4: LogicalPin = LogicalPin::new(Port::B.pin_value(4), "GPB4");
pub const GPB5: LogicalPin = LogicalPin::new(Port::B.pin_value(5), "GPB5");
pub const GPB6: LogicalPin = LogicalPin::new(Port::B.pin_value(6), "GPB6");
pub const GPB7: LogicalPin = LogicalPin::new(Port::B.pin_value(7), "GPB7");

/// All sixteen pins, port A first, in bit order.
pub const PINS: [LogicalPin; 16] = [
    GPA0, GPA1, GPA2, GPA3, GPA4, GPA5, GPA6, GPA7, GPB0, GPB1, GPB2, GPB3, GPB4, GPB5, GPB6, GPB7,
];

/// The board pin at `bit` of `port`.
pub fn pin_at(port: Port, bit: u8) -> Option<LogicalPin> {
    if bit > 7 {
        return None;
    }
    PINS.get(port.index() * 8 + usize::from(bit)).copied()
}

pub fn by_name(name: &str) -> Option<LogicalPin> {
    PINS.iter().copied().find(|p| p.name().eq_ignore_ascii_case(name))
}
