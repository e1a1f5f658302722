use core::fmt;

pub use embedded_hal::digital::PinState;

use crate::Result;

/// Numeric offset that moves a port A bit weight into port B.
pub const PORT_B_OFFSET: u16 = 1000;

/// One of the two 8-bit ports of the expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    A,
    B,
}

impl Port {
    pub const ALL: [Port; 2] = [Port::A, Port::B];

    pub(crate) const fn index(self) -> usize {
        match self {
            Port::A => 0,
            Port::B => 1,
        }
    }

    /// Numeric value of the pin at `bit` (0..=7) on this port.
    pub const fn pin_value(self, bit: u8) -> u16 {
        let weight = 1u16 << bit;
        match self {
            Port::A => weight,
            Port::B => weight + PORT_B_OFFSET,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::A => f.write_str("A"),
            Port::B => f.write_str("B"),
        }
    }
}

/// A pin identifier: a numeric value plus a display name.
///
/// Port A pins use their bit weight as value (`1, 2, 4, .. 128`); port B pins
/// use the same weights plus [`PORT_B_OFFSET`]. Whether the value actually
/// names a pin is checked when the pin is used, see [`crate::cache::bit_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogicalPin {
    value: u16,
    name: &'static str,
}

impl LogicalPin {
    pub const fn new(value: u16, name: &'static str) -> Self {
        Self { value, name }
    }

    pub const fn value(&self) -> u16 {
        self.value
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for LogicalPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    Input,
    Output,
    /// Not available on the expander.
    Pwm,
    /// Not available on the expander.
    Clock,
    /// Not available on the expander.
    Tristate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinPullResistance {
    #[default]
    Off,
    /// The MCP23S17 has no pull-downs; requesting one is an error.
    PullDown,
    PullUp,
}

/// A level change on an input pin, as observed by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinStateChangeEvent {
    pub pin: LogicalPin,
    pub old: PinState,
    pub new: PinState,
}

/// Initial configuration written when a pin is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub mode: PinMode,
    pub pull: PinPullResistance,
    pub initial: PinState,
}

impl PinConfig {
    pub const fn new(mode: PinMode) -> Self {
        Self {
            mode,
            pull: PinPullResistance::Off,
            initial: PinState::Low,
        }
    }

    pub const fn with_pull(mut self, pull: PinPullResistance) -> Self {
        self.pull = pull;
        self
    }

    pub const fn with_initial(mut self, initial: PinState) -> Self {
        self.initial = initial;
        self
    }
}

/// A single digital pin that can be reconfigured, driven and sampled.
pub trait DigitalPin {
    fn mode(&self) -> Result<PinMode>;

    fn set_mode(&mut self, mode: PinMode) -> Result<()>;

    fn read(&mut self) -> Result<PinState>;

    fn write(&mut self, level: PinState) -> Result<()>;

    fn toggle(&mut self) -> Result<()> {
        let level = match self.read()? {
            PinState::High => PinState::Low,
            PinState::Low => PinState::High,
        };
        self.write(level)
    }
}

/// Something that runs on a recurring schedule.
///
/// `start` on a running instance and `stop` on a stopped one are no-ops.
pub trait Pollable {
    fn start(&mut self);

    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
