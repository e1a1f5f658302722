//! Pin-level driver for the MCP23S17 SPI port expander.
//!
//! The expander has two 8-bit ports, A and B. Each pin is addressed by a
//! [`LogicalPin`]: port A pins carry their bit weight (`1, 2, 4, .. 128`),
//! port B pins the same weights plus [`PORT_B_OFFSET`]. The [`board`] module
//! names all sixteen.
//!
//! [`Mcp23s17`] keeps a mirror of the chip's direction, pull-up,
//! interrupt-enable, output latch and GPIO registers and turns every pin
//! operation into a read-modify-write of the mirrored byte plus one 3-byte
//! register write. Input pins are watched by a poller that samples the
//! interrupt flags on a fixed interval and publishes a
//! [`PinStateChangeEvent`] per changed pin.
//!
//! ```no_run
//! # async fn run<SPI>(spi: SPI) -> mcp23s17_pins::Result<()>
//! # where SPI: embedded_hal::spi::SpiDevice + Send + 'static {
//! use mcp23s17_pins::{board, Config, Mcp23s17, PinMode};
//!
//! let expander = Mcp23s17::new_mcp23s17(spi, &Config::default())?;
//! expander.export(board::GPA0, PinMode::Output)?;
//! expander.export(board::GPB2, PinMode::Input)?;
//!
//! let mut changes = expander.subscribe();
//! while let Ok(change) = changes.recv().await {
//!     expander.write(board::GPA0, change.new)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod cache;
mod common;
pub mod config;
pub mod dev;
mod driver;
pub mod error;
mod pin;
pub mod poller;
pub mod registry;
#[cfg(feature = "spidev")]
pub mod spidev;

#[cfg(test)]
mod mock;

pub use common::{
    DigitalPin, LogicalPin, PinConfig, PinMode, PinPullResistance, PinState,
    PinStateChangeEvent, Pollable, Port, PORT_B_OFFSET,
};
pub use config::{Config, HardwareAddress};
pub use dev::mcp23s17::{BusError, Mcp23S17Bus, Register, RegisterBus};
pub use driver::Mcp23s17;
pub use error::{Error, Operation, Result};
pub use pin::Pin;
pub use registry::ExportedPin;
