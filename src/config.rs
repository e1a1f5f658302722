//! Driver configuration.
use std::time::Duration;

pub use crate::dev::mcp23s17::HardwareAddress;

/// SPI clock used when the driver opens the bus itself.
pub const DEFAULT_BUS_SPEED_HZ: u32 = 1_000_000;

/// Interval between two interrupt-flag polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Change events buffered per subscriber before the slowest one starts
/// losing the oldest.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub address: HardwareAddress,
    pub bus_speed_hz: u32,
    pub poll_interval: Duration,
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: HardwareAddress::default(),
            bus_speed_hz: DEFAULT_BUS_SPEED_HZ,
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl Config {
    pub fn with_address(mut self, address: HardwareAddress) -> Self {
        self.address = address;
        self
    }

    pub fn with_bus_speed_hz(mut self, hz: u32) -> Self {
        self.bus_speed_hz = hz;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Zero is bumped to one, tokio's broadcast channel needs room for at least one event.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.address, HardwareAddress::A0);
        assert_eq!(config.bus_speed_hz, 1_000_000);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn builder() {
        let config = Config::default()
            .with_address(HardwareAddress::A2)
            .with_poll_interval(Duration::from_millis(10))
            .with_event_capacity(0);
        assert_eq!(config.address, HardwareAddress::A2);
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.event_capacity, 1);
    }
}
