use embedded_hal::digital::{self, ErrorType};
use embedded_hal_async::digital::Wait;
use tokio::sync::broadcast::error::RecvError;

use crate::dev::mcp23s17::RegisterBus;
use crate::error::{Error, Operation, Result};
use crate::{
    DigitalPin, LogicalPin, Mcp23s17, PinMode, PinPullResistance, PinState, PinStateChangeEvent,
};

/// Handle for one pin of a [`Mcp23s17`].
///
/// Handles are cheap; several may refer to the same pin.
pub struct Pin<'a, B: RegisterBus> {
    pin: LogicalPin,
    dev: &'a Mcp23s17<B>,
}

impl<'a, B: RegisterBus> Pin<'a, B> {
    pub(crate) fn new(pin: LogicalPin, dev: &'a Mcp23s17<B>) -> Self {
        Self { pin, dev }
    }

    pub fn id(&self) -> LogicalPin {
        self.pin
    }

    pub fn set_pull_resistance(&mut self, pull: PinPullResistance) -> Result<()> {
        self.dev.set_pull_resistance(self.pin, pull)
    }

    pub fn pull_resistance(&self) -> Result<PinPullResistance> {
        self.dev.pull_resistance(self.pin)
    }

    pub fn export(&mut self, mode: PinMode) -> Result<()> {
        self.dev.export(self.pin, mode)
    }

    pub fn unexport(&mut self) -> Result<()> {
        self.dev.unexport(self.pin)
    }

    /// Wait for the poller to report a change of this pin that `accept`s.
    async fn wait_for(&mut self, accept: impl Fn(&PinStateChangeEvent) -> bool) -> Result<()> {
        let op = Operation::Wait(self.pin);
        if self.dev.mode(self.pin)? != PinMode::Input {
            return Err(Error::Unsupported {
                op,
                what: "waiting on an output pin",
            });
        }
        let mut events = self.dev.subscribe();
        loop {
            match events.recv().await {
                Ok(event) if event.pin.value() == self.pin.value() && accept(&event) => {
                    return Ok(())
                }
                Ok(_) => {}
                // Missed events; the current level still decides level waits.
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Err(Error::Disposed { op }),
            }
        }
    }

    async fn wait_for_level(&mut self, level: PinState) -> Result<()> {
        let op = Operation::Wait(self.pin);
        if self.dev.mode(self.pin)? != PinMode::Input {
            return Err(Error::Unsupported {
                op,
                what: "waiting on an output pin",
            });
        }
        // Subscribe first so a change between the read and the wait is not lost.
        let mut events = self.dev.subscribe();
        if self.dev.read(self.pin)? == level {
            return Ok(());
        }
        loop {
            match events.recv().await {
                Ok(event) if event.pin.value() == self.pin.value() && event.new == level => {
                    return Ok(())
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {
                    if self.dev.read(self.pin)? == level {
                        return Ok(());
                    }
                }
                Err(RecvError::Closed) => return Err(Error::Disposed { op }),
            }
        }
    }
}

impl<B: RegisterBus> DigitalPin for Pin<'_, B> {
    fn mode(&self) -> Result<PinMode> {
        self.dev.mode(self.pin)
    }

    fn set_mode(&mut self, mode: PinMode) -> Result<()> {
        self.dev.set_mode(self.pin, mode)
    }

    fn read(&mut self) -> Result<PinState> {
        self.dev.read(self.pin)
    }

    fn write(&mut self, level: PinState) -> Result<()> {
        self.dev.write(self.pin, level)
    }
}

impl digital::Error for Error {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl<B: RegisterBus> ErrorType for Pin<'_, B> {
    type Error = Error;
}

impl<B: RegisterBus> digital::InputPin for Pin<'_, B> {
    fn is_high(&mut self) -> Result<bool> {
        Ok(DigitalPin::read(self)? == PinState::High)
    }

    fn is_low(&mut self) -> Result<bool> {
        Ok(DigitalPin::read(self)? == PinState::Low)
    }
}

impl<B: RegisterBus> digital::OutputPin for Pin<'_, B> {
    fn set_low(&mut self) -> Result<()> {
        DigitalPin::write(self, PinState::Low)
    }

    fn set_high(&mut self) -> Result<()> {
        DigitalPin::write(self, PinState::High)
    }
}

impl<B: RegisterBus> digital::StatefulOutputPin for Pin<'_, B> {
    fn is_set_high(&mut self) -> Result<bool> {
        Ok(DigitalPin::read(self)? == PinState::High)
    }

    fn is_set_low(&mut self) -> Result<bool> {
        Ok(DigitalPin::read(self)? == PinState::Low)
    }

    fn toggle(&mut self) -> Result<()> {
        DigitalPin::toggle(self)
    }
}

/// Waits are served by the poller, so they resolve up to one poll interval
/// after the edge.
impl<B: RegisterBus> Wait for Pin<'_, B> {
    async fn wait_for_high(&mut self) -> Result<()> {
        self.wait_for_level(PinState::High).await
    }

    async fn wait_for_low(&mut self) -> Result<()> {
        self.wait_for_level(PinState::Low).await
    }

    async fn wait_for_rising_edge(&mut self) -> Result<()> {
        self.wait_for(|e| e.old == PinState::Low && e.new == PinState::High)
            .await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<()> {
        self.wait_for(|e| e.old == PinState::High && e.new == PinState::Low)
            .await
    }

    async fn wait_for_any_edge(&mut self) -> Result<()> {
        self.wait_for(|_| true).await
    }
}
