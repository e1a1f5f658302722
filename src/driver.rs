//! Pin-level control of one MCP23S17.
//!
//! [`Mcp23s17`] turns single-pin requests into read-modify-write updates of
//! the cached port registers followed by the register writes they need. The
//! cache is only updated once every write went through, so a failed call
//! leaves it exactly as it was.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use embedded_hal::spi::SpiDevice;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::{apply_bit, bit_for, bit_level, PortRegisters, PortStateCache};
use crate::config::{Config, HardwareAddress};
use crate::dev::mcp23s17::{Mcp23S17Bus, Register, RegisterBus};
use crate::error::{Error, Operation, Result};
use crate::poller::{InterruptPoller, PollTarget};
use crate::registry::{self, ExportedPin, ExportedPinRegistry};
use crate::{
    board, LogicalPin, Pin, PinConfig, PinMode, PinPullResistance, PinState,
    PinStateChangeEvent, Pollable, Port,
};

/// Registers zeroed at start-up, in write order.
const INIT_REGISTERS: [Register; 8] = [
    Register::IODIRA,
    Register::IODIRB,
    Register::GPPUA,
    Register::GPPUB,
    Register::GPINTENA,
    Register::GPINTENB,
    Register::OLATA,
    Register::OLATB,
];

pub(crate) struct Driver<B> {
    bus: B,
    cache: PortStateCache,
    registry: ExportedPinRegistry,
    poller: InterruptPoller,
    events: broadcast::Sender<PinStateChangeEvent>,
    disposed: bool,
}

impl<B: RegisterBus> Driver<B> {
    fn init(&mut self, address: HardwareAddress) -> Result<()> {
        let op = Operation::Init;
        if address != HardwareAddress::A0 {
            self.bus
                .enable_hardware_addressing()
                .map_err(Error::transport(op))?;
        }
        for reg in INIT_REGISTERS {
            self.bus.write_reg(reg, 0x00).map_err(Error::transport(op))?;
        }
        self.cache = PortStateCache::new();
        info!(?address, "MCP23S17 initialised");
        Ok(())
    }

    fn ensure_live(&self, op: Operation) -> Result<()> {
        if self.disposed {
            return Err(Error::Disposed { op });
        }
        Ok(())
    }

    fn locate(&self, pin: LogicalPin, op: Operation) -> Result<(Port, u8)> {
        self.ensure_live(op)?;
        bit_for(pin, op)
    }

    fn direction_bit(mode: PinMode, op: Operation) -> Result<PinState> {
        match mode {
            PinMode::Input => Ok(PinState::High),
            PinMode::Output => Ok(PinState::Low),
            PinMode::Pwm | PinMode::Clock | PinMode::Tristate => Err(Error::Unsupported {
                op,
                what: "pin modes other than input and output",
            }),
        }
    }

    fn pull_bit(pull: PinPullResistance, op: Operation) -> Result<PinState> {
        match pull {
            PinPullResistance::Off => Ok(PinState::Low),
            PinPullResistance::PullUp => Ok(PinState::High),
            PinPullResistance::PullDown => Err(Error::Unsupported {
                op,
                what: "pull-down resistance",
            }),
        }
    }

    fn set_mode(&mut self, pin: LogicalPin, mode: PinMode) -> Result<()> {
        let op = Operation::SetMode(pin);
        let (port, mask) = self.locate(pin, op)?;
        let bit = Self::direction_bit(mode, op)?;

        let mut next = *self.cache.port(port);
        next.direction = apply_bit(next.direction, mask, bit);
        // Every input pin takes part in change notification.
        next.interrupt_enable = next.direction;
        self.commit(
            port,
            next,
            [
                (Register::iodir(port), next.direction),
                (Register::gpinten(port), next.interrupt_enable),
            ],
            op,
        )?;
        self.registry.update_mode(pin, mode);
        debug!(%pin, ?mode, "pin mode set");
        Ok(())
    }

    /// Write `writes` in order, then replace the cached registers of `port`
    /// with `next`. Nothing is cached unless every write went through.
    fn commit(
        &mut self,
        port: Port,
        next: PortRegisters,
        writes: impl IntoIterator<Item = (Register, u8)>,
        op: Operation,
    ) -> Result<()> {
        for (reg, value) in writes {
            self.bus.write_reg(reg, value).map_err(Error::transport(op))?;
        }
        *self.cache.port_mut(port) = next;

        if self.cache.has_inputs() {
            self.poller.start();
        } else {
            self.poller.stop();
        }
        Ok(())
    }

    fn mode(&self, pin: LogicalPin) -> Result<PinMode> {
        let op = Operation::Mode(pin);
        let (port, mask) = self.locate(pin, op)?;
        Ok(if self.cache.is_input(port, mask) {
            PinMode::Input
        } else {
            PinMode::Output
        })
    }

    fn write(&mut self, pin: LogicalPin, level: PinState) -> Result<()> {
        let op = Operation::Write(pin);
        let (port, mask) = self.locate(pin, op)?;

        let latch = apply_bit(self.cache.port(port).output_latch, mask, level);
        self.bus
            .write_reg(Register::olat(port), latch)
            .map_err(Error::transport(op))?;
        self.cache.port_mut(port).output_latch = latch;
        debug!(%pin, ?level, "pin written");
        Ok(())
    }

    fn read(&mut self, pin: LogicalPin) -> Result<PinState> {
        let op = Operation::Read(pin);
        let (port, mask) = self.locate(pin, op)?;

        if !self.cache.is_input(port, mask) {
            return Ok(bit_level(self.cache.port(port).output_latch, mask));
        }

        let gpio = self
            .bus
            .read_reg(Register::gpio(port))
            .map_err(Error::transport(op))?;
        let level = bit_level(gpio, mask);
        // Only this pin's bit: the others are still owed to the poller.
        let regs = self.cache.port_mut(port);
        regs.gpio = apply_bit(regs.gpio, mask, level);
        Ok(level)
    }

    fn set_pull_resistance(&mut self, pin: LogicalPin, pull: PinPullResistance) -> Result<()> {
        let op = Operation::SetPullResistance(pin);
        let (port, mask) = self.locate(pin, op)?;
        let bit = Self::pull_bit(pull, op)?;

        let pull_up = apply_bit(self.cache.port(port).pull_up, mask, bit);
        self.bus
            .write_reg(Register::gppu(port), pull_up)
            .map_err(Error::transport(op))?;
        self.cache.port_mut(port).pull_up = pull_up;
        debug!(%pin, ?pull, "pull resistance set");
        Ok(())
    }

    fn pull_resistance(&self, pin: LogicalPin) -> Result<PinPullResistance> {
        let op = Operation::PullResistance(pin);
        let (port, mask) = self.locate(pin, op)?;
        Ok(match bit_level(self.cache.port(port).pull_up, mask) {
            PinState::High => PinPullResistance::PullUp,
            PinState::Low => PinPullResistance::Off,
        })
    }

    fn provision(&mut self, pin: LogicalPin, config: PinConfig) -> Result<()> {
        let op = Operation::Provision(pin);
        let (port, mask) = self.locate(pin, op)?;
        // Reject before touching the bus so nothing is half configured.
        let direction = Self::direction_bit(config.mode, op)?;
        let pull = Self::pull_bit(config.pull, op)?;
        let full = Error::Unsupported {
            op,
            what: "more exported pins than the chip has",
        };
        if !self.registry.contains(pin) && self.registry.len() == registry::CAPACITY {
            return Err(full);
        }

        let current = *self.cache.port(port);
        let mut next = current;
        next.direction = apply_bit(current.direction, mask, direction);
        next.interrupt_enable = next.direction;
        next.pull_up = apply_bit(current.pull_up, mask, pull);
        next.output_latch = apply_bit(current.output_latch, mask, config.initial);

        // A pin exported with this mode only needs the registers that differ.
        let exported = self.registry.get(pin).is_some_and(|e| e.mode == config.mode);
        if exported && next == current {
            debug!(%pin, "already provisioned");
            return Ok(());
        }
        let writes = [
            (Register::iodir(port), next.direction, current.direction),
            (Register::gpinten(port), next.interrupt_enable, current.interrupt_enable),
            (Register::gppu(port), next.pull_up, current.pull_up),
            (Register::olat(port), next.output_latch, current.output_latch),
        ]
        .into_iter()
        .filter(|&(_, new, old)| !exported || new != old)
        .map(|(reg, new, _)| (reg, new));
        self.commit(port, next, writes, op)?;

        self.registry.insert(pin, config.mode).map_err(|_| full)?;
        info!(%pin, mode = ?config.mode, pull = ?config.pull, "pin provisioned");
        Ok(())
    }

    fn unexport(&mut self, pin: LogicalPin) -> Result<()> {
        let op = Operation::Unexport(pin);
        let (port, mask) = self.locate(pin, op)?;
        if !self.registry.contains(pin) {
            debug!(%pin, "not exported");
            return Ok(());
        }

        let mut next = *self.cache.port(port);
        next.output_latch = apply_bit(next.output_latch, mask, PinState::Low);
        next.direction = apply_bit(next.direction, mask, PinState::Low);
        next.interrupt_enable = next.direction;
        self.commit(
            port,
            next,
            [
                (Register::olat(port), next.output_latch),
                (Register::iodir(port), next.direction),
                (Register::gpinten(port), next.interrupt_enable),
            ],
            op,
        )?;
        self.registry.remove(pin);
        info!(%pin, "pin unexported");
        Ok(())
    }

    /// One poller tick over both ports. Returns the number of events sent.
    fn poll(&mut self) -> Result<usize> {
        let op = Operation::Poll;
        self.ensure_live(op)?;

        let mut sent = 0;
        for port in Port::ALL {
            let PortRegisters {
                direction, gpio, ..
            } = *self.cache.port(port);
            if direction == 0 {
                continue;
            }

            let flags = self
                .bus
                .read_reg(Register::intf(port))
                .map_err(Error::transport(op))?;
            if flags == 0 {
                continue;
            }
            let fresh = self
                .bus
                .read_reg(Register::gpio(port))
                .map_err(Error::transport(op))?;

            // Output bits may read back anything, only inputs are compared.
            let changed = (fresh ^ gpio) & direction;
            for bit in (0..8u8).filter(|&b| changed & (1u8 << b) != 0) {
                let mask = 1u8 << bit;
                let event = PinStateChangeEvent {
                    pin: self.pin_at(port, bit),
                    old: bit_level(gpio, mask),
                    new: bit_level(fresh, mask),
                };
                debug!(pin = %event.pin, old = ?event.old, new = ?event.new, "pin changed");
                // Nobody listening is fine.
                let _ = self.events.send(event);
                sent += 1;
            }
            self.cache.port_mut(port).gpio = fresh;
        }
        Ok(sent)
    }

    /// The caller's own `LogicalPin` if the bit is exported, the board pin otherwise.
    fn pin_at(&self, port: Port, bit: u8) -> LogicalPin {
        let value = port.pin_value(bit);
        self.registry
            .iter()
            .map(|e| e.pin)
            .find(|p| p.value() == value)
            .or_else(|| board::pin_at(port, bit))
            .unwrap_or(LogicalPin::new(value, "?"))
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.poller.stop();

        let outputs: Vec<LogicalPin> = self
            .registry
            .iter()
            .filter(|e| e.mode == PinMode::Output)
            .map(|e| e.pin)
            .collect();
        let mut first_error = None;
        for pin in outputs {
            if let Err(e) = self.write(pin, PinState::Low) {
                warn!(%pin, error = %e, "could not drive pin low on dispose");
                first_error.get_or_insert(e);
            }
        }

        self.registry.clear();
        self.disposed = true;
        info!("MCP23S17 driver disposed");
        first_error.map_or(Ok(()), Err)
    }
}

impl<B: RegisterBus + Send + 'static> PollTarget for Mutex<Driver<B>> {
    fn tick(&self, generation: u64) -> bool {
        let mut driver = self.lock().unwrap_or_else(PoisonError::into_inner);
        if driver.disposed || !driver.poller.is_current(generation) {
            return false;
        }
        if let Err(e) = driver.poll() {
            warn!(error = %e, "poll tick failed");
        }
        true
    }
}

/// Driver for one MCP23S17 on a shared SPI bus.
///
/// Construction zeroes the direction, pull-up, interrupt-enable and output
/// latch registers of both ports, so every pin starts as a low output.
pub struct Mcp23s17<B: RegisterBus> {
    inner: Arc<Mutex<Driver<B>>>,
}

impl<SPI> Mcp23s17<Mcp23S17Bus<SPI>>
where
    SPI: SpiDevice + Send + 'static,
{
    /// Create a new instance of the MCP23S17 with SPI interface
    pub fn new_mcp23s17(spi: SPI, config: &Config) -> Result<Self> {
        Self::new(Mcp23S17Bus::new(spi, config.address), config)
    }
}

impl<B: RegisterBus + Send + 'static> Mcp23s17<B> {
    /// Create the driver, scheduling the poller on the current tokio runtime
    /// if there is one.
    pub fn new(bus: B, config: &Config) -> Result<Self> {
        Self::with_runtime(bus, config, Handle::try_current().ok())
    }

    /// Create the driver with an explicit runtime for the poll task.
    ///
    /// With `None` nothing is scheduled and [`poll`](Self::poll) has to be
    /// called by the owner.
    pub fn with_runtime(bus: B, config: &Config, runtime: Option<Handle>) -> Result<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let mut driver = Driver {
            bus,
            cache: PortStateCache::new(),
            registry: ExportedPinRegistry::new(),
            poller: InterruptPoller::new(config.poll_interval, runtime),
            events,
            disposed: false,
        };
        driver.init(config.address)?;

        let inner = Arc::new_cyclic(move |weak: &Weak<Mutex<Driver<B>>>| {
            let target: Weak<dyn PollTarget> = weak.clone();
            driver.poller.attach(target);
            Mutex::new(driver)
        });
        Ok(Self { inner })
    }
}

impl<B: RegisterBus> Mcp23s17<B> {
    fn lock(&self) -> MutexGuard<'_, Driver<B>> {
        // The cache is only committed after a successful write, so a
        // panicked holder cannot have left it half updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle for a single pin.
    pub fn pin(&self, pin: LogicalPin) -> Pin<'_, B> {
        Pin::new(pin, self)
    }

    /// Configure `pin` as input or output.
    ///
    /// Input pins are always enabled for change notification. The poller runs
    /// exactly while at least one pin is an input.
    pub fn set_mode(&self, pin: LogicalPin, mode: PinMode) -> Result<()> {
        self.lock().set_mode(pin, mode)
    }

    pub fn mode(&self, pin: LogicalPin) -> Result<PinMode> {
        self.lock().mode(pin)
    }

    pub fn write(&self, pin: LogicalPin, level: PinState) -> Result<()> {
        self.lock().write(pin, level)
    }

    /// Output pins answer from the cached latch, input pins read the chip.
    pub fn read(&self, pin: LogicalPin) -> Result<PinState> {
        self.lock().read(pin)
    }

    pub fn set_pull_resistance(&self, pin: LogicalPin, pull: PinPullResistance) -> Result<()> {
        self.lock().set_pull_resistance(pin, pull)
    }

    pub fn pull_resistance(&self, pin: LogicalPin) -> Result<PinPullResistance> {
        self.lock().pull_resistance(pin)
    }

    /// Write mode, pull resistance and initial level, then record the pin as
    /// exported. Either every register is written and cached or none is.
    ///
    /// Provisioning a pin again with the same mode only rewrites the pull-up
    /// and latch registers that differ from `config`, and nothing at all when
    /// they already match.
    pub fn provision(&self, pin: LogicalPin, config: PinConfig) -> Result<()> {
        self.lock().provision(pin, config)
    }

    /// [`provision`](Self::provision) with no pull resistance and a low level.
    pub fn export(&self, pin: LogicalPin, mode: PinMode) -> Result<()> {
        self.provision(pin, PinConfig::new(mode))
    }

    /// Drive `pin` low, make it an output and forget it.
    pub fn unexport(&self, pin: LogicalPin) -> Result<()> {
        self.lock().unexport(pin)
    }

    /// Exported pins in export order.
    pub fn exported(&self) -> Vec<ExportedPin> {
        self.lock().registry.iter().copied().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PinStateChangeEvent> {
        self.lock().events.subscribe()
    }

    /// Run one poller tick now and return how many change events it sent.
    pub fn poll(&self) -> Result<usize> {
        self.lock().poll()
    }

    pub fn is_polling(&self) -> bool {
        self.lock().poller.is_running()
    }

    /// Copy of the cached registers of `port`.
    pub fn port_registers(&self, port: Port) -> PortRegisters {
        *self.lock().cache.port(port)
    }

    /// Stop the poller, drive every exported output low and forget all pins.
    ///
    /// Every later call fails with [`Error::Disposed`]. Disposing again does
    /// nothing. Teardown always completes; the first write failure is returned.
    pub fn dispose(&self) -> Result<()> {
        self.lock().dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

impl<B: RegisterBus> Drop for Mcp23s17<B> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            warn!(error = %e, "dispose on drop failed");
        }
    }
}
