//! In-memory MCP23S17 for driver tests.
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::spi::ErrorKind;

use crate::dev::mcp23s17::{BusError, Register, RegisterBus, IOCON_HAEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Write(Register, u8),
    Read(Register),
}

#[derive(Debug, Default)]
pub struct FakeChip {
    pub regs: [u8; 0x16],
    pub log: Vec<Access>,
    /// Fail every transaction on this register.
    pub fail_on: Option<(Register, ErrorKind)>,
}

impl FakeChip {
    pub fn set(&mut self, reg: Register, value: u8) {
        self.regs[reg as usize] = value;
    }

    pub fn get(&self, reg: Register) -> u8 {
        self.regs[reg as usize]
    }

    pub fn writes(&self) -> Vec<(Register, u8)> {
        self.log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(reg, value) => Some((reg, value)),
                Access::Read(_) => None,
            })
            .collect()
    }

    pub fn reads(&self) -> Vec<Register> {
        self.log
            .iter()
            .filter_map(|a| match *a {
                Access::Read(reg) => Some(reg),
                Access::Write(..) => None,
            })
            .collect()
    }

    fn check(&self, reg: Register) -> Result<(), BusError> {
        match self.fail_on {
            Some((failing, kind)) if failing == reg => Err(BusError {
                register: reg,
                kind,
            }),
            _ => Ok(()),
        }
    }
}

/// Cloneable handle; the test keeps one clone to look inside the chip.
#[derive(Debug, Clone, Default)]
pub struct FakeBus(Arc<Mutex<FakeChip>>);

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chip(&self) -> MutexGuard<'_, FakeChip> {
        self.0.lock().unwrap()
    }
}

impl RegisterBus for FakeBus {
    fn write_reg(&mut self, reg: Register, value: u8) -> Result<(), BusError> {
        let mut chip = self.chip();
        chip.check(reg)?;
        chip.log.push(Access::Write(reg, value));
        chip.set(reg, value);
        Ok(())
    }

    fn read_reg(&mut self, reg: Register) -> Result<u8, BusError> {
        let mut chip = self.chip();
        chip.check(reg)?;
        chip.log.push(Access::Read(reg));
        let value = chip.get(reg);
        // reading GPIO or INTCAP clears the interrupt condition
        match reg {
            Register::GPIOA | Register::INTCAPA => chip.set(Register::INTFA, 0),
            Register::GPIOB | Register::INTCAPB => chip.set(Register::INTFB, 0),
            _ => {}
        }
        Ok(value)
    }

    // The fake answers on every address.
    fn enable_hardware_addressing(&mut self) -> Result<(), BusError> {
        self.write_reg(Register::IOCONA, IOCON_HAEN)
    }
}
