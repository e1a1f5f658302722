//! Linux `/dev/spidevB.C` binding.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use mcp23s17_pins::{board, spidev, Config, Mcp23s17, PinMode, PinState};
//!
//! let config = Config::default();
//! let spi = spidev::open("/dev/spidev0.0", &config)?;
//! let expander = Mcp23s17::new_mcp23s17(spi, &config)?;
//! expander.export(board::GPA0, PinMode::Output)?;
//! expander.write(board::GPA0, PinState::High)?;
//! # Ok(())
//! # }
//! ```
use std::io;
use std::path::Path;

use linux_embedded_hal::spidev::{SpiModeFlags, Spidev, SpidevOptions};
pub use linux_embedded_hal::SpidevDevice;
use tracing::info;

use crate::Config;

/// Open and configure a spidev node for the expander: SPI mode 0, 8-bit
/// words, clocked at [`Config::bus_speed_hz`].
pub fn open(path: impl AsRef<Path>, config: &Config) -> io::Result<SpidevDevice> {
    let path = path.as_ref();
    let mut spi = Spidev::open(path)?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.bus_speed_hz)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options)?;
    info!(path = %path.display(), speed_hz = config.bus_speed_hz, "spidev opened");
    Ok(SpidevDevice(spi))
}
