//! Pins the driver is actively managing.
use crate::{LogicalPin, PinMode};

/// The expander has sixteen pins; the registry can never hold more.
pub const CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportedPin {
    pub pin: LogicalPin,
    pub mode: PinMode,
}

/// Provisioned pins in export order.
///
/// Keyed by pin value, so two `LogicalPin`s naming the same bit are one entry.
#[derive(Debug, Default)]
pub struct ExportedPinRegistry {
    pins: heapless::Vec<ExportedPin, CAPACITY>,
}

impl ExportedPinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, pin: LogicalPin) -> Option<usize> {
        self.pins.iter().position(|e| e.pin.value() == pin.value())
    }

    pub fn get(&self, pin: LogicalPin) -> Option<&ExportedPin> {
        self.position(pin).and_then(|i| self.pins.get(i))
    }

    pub fn contains(&self, pin: LogicalPin) -> bool {
        self.position(pin).is_some()
    }

    /// Record `pin` with `mode`, updating the mode of an existing entry.
    ///
    /// Returns the entry that was rejected if the registry is full. That can
    /// only happen with more distinct pin values than the chip has pins.
    pub fn insert(&mut self, pin: LogicalPin, mode: PinMode) -> Result<(), ExportedPin> {
        let entry = ExportedPin { pin, mode };
        match self.position(pin) {
            Some(i) => {
                self.pins[i] = entry;
                Ok(())
            }
            None => self.pins.push(entry),
        }
    }

    /// Keep an existing entry's mode in step with the pin.
    pub fn update_mode(&mut self, pin: LogicalPin, mode: PinMode) {
        if let Some(i) = self.position(pin) {
            self.pins[i].mode = mode;
        }
    }

    pub fn remove(&mut self, pin: LogicalPin) -> Option<ExportedPin> {
        self.position(pin).map(|i| self.pins.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExportedPin> {
        self.pins.iter()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn clear(&mut self) {
        self.pins.clear();
    }
}
