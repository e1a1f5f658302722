//! Register protocol of the `MCP23S17` "16-Bit I/O Expander with Serial Interface"
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf
//!
//! Every register access is one 3-byte SPI transaction:
//!
//! ```text
//! byte 0: 0 1 0 0 A2 A1 A0 R/W   (opcode, R/W = 1 for reads)
//! byte 1: register address
//! byte 2: data (zero on reads, the register value comes back in this slot)
//! ```
//!
//! Only A0 and A1 are strapped on the expansion board, so four chips can share
//! one chip-select line.
use embedded_hal::spi::{Error as _, ErrorKind, SpiDevice};

use crate::Port;

/// Control byte prefix `0100` shifted into the upper nibble.
const OPCODE: u8 = 0x40;
/// R/W flag in the control byte.
const OPCODE_READ: u8 = 0x01;
/// IOCON.HAEN: enables the A2..A0 address pins on the MCP23S17.
pub const IOCON_HAEN: u8 = 0b0000_1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
/// N.B.: These values are for BANK=0, which is the reset state of
/// the chip (and this driver does not change).
///
/// For all registers, the reset value is 0x00, except for
/// IODIR{A,B} which are 0xFF (making all pins inputs) at reset.
pub enum Register {
    /// IODIR: input/output direction: 0=output; 1=input
    IODIRA = 0x00,
    IODIRB = 0x01,
    /// IPOL: input polarity: 0=register values match input pins; 1=opposite
    IPOLA = 0x02,
    IPOLB = 0x03,
    /// GPINTEN: interrupt-on-change: 0=disable; 1=enable
    GPINTENA = 0x04,
    GPINTENB = 0x05,
    /// DEFVAL: default values for interrupt-on-change
    DEFVALA = 0x06,
    DEFVALB = 0x07,
    /// INTCON: interrupt-on-change config: 0=compare to previous pin value;
    ///   1=compare to corresponding bit in DEFVAL
    INTCONA = 0x08,
    INTCONB = 0x09,
    /// IOCON: configuration register, shared by both ports
    /// - Pin 7: BANK (which driver assumes stays 0)
    /// - Pin 6: MIRROR: INT{A,B} are logically ORed
    /// - Pin 5: SEQOP: controls the incrementing function of the address pointer
    /// - Pin 4: DISSLW: slew rate control (I2C variant only)
    /// - Pin 3: HAEN: enables address pins on MCP23S17
    /// - Pin 2: ODR: interrupt pins are open-drain
    /// - Pin 1: INTPOL: interrupt pin is 0=active-low or 1=active-high
    IOCONA = 0x0a,
    IOCONB = 0x0b,
    /// GPPU: weak 100k pull-ups on pins configured as inputs
    GPPUA = 0x0c,
    GPPUB = 0x0d,
    /// INTF: interrupt flags: 1=corresponding pin caused interrupt
    INTFA = 0x0e,
    INTFB = 0x0f,
    /// INTCAP: value of each pin at the time of the interrupt
    INTCAPA = 0x10,
    INTCAPB = 0x11,
    /// GPIO: reflects logic level on pins
    GPIOA = 0x12,
    GPIOB = 0x13,
    /// OLAT: output latches: sets state for pins configured as outputs
    OLATA = 0x14,
    OLATB = 0x15,
}

impl Register {
    const fn select(port: Port, a: Self, b: Self) -> Self {
        match port {
            Port::A => a,
            Port::B => b,
        }
    }

    pub const fn iodir(port: Port) -> Self {
        Self::select(port, Self::IODIRA, Self::IODIRB)
    }

    pub const fn gpinten(port: Port) -> Self {
        Self::select(port, Self::GPINTENA, Self::GPINTENB)
    }

    pub const fn gppu(port: Port) -> Self {
        Self::select(port, Self::GPPUA, Self::GPPUB)
    }

    pub const fn intf(port: Port) -> Self {
        Self::select(port, Self::INTFA, Self::INTFB)
    }

    pub const fn intcap(port: Port) -> Self {
        Self::select(port, Self::INTCAPA, Self::INTCAPB)
    }

    pub const fn gpio(port: Port) -> Self {
        Self::select(port, Self::GPIOA, Self::GPIOB)
    }

    pub const fn olat(port: Port) -> Self {
        Self::select(port, Self::OLATA, Self::OLATB)
    }
}

impl From<Register> for u8 {
    fn from(r: Register) -> u8 {
        r as u8
    }
}

/// One of the four hardware-strapped chip addresses (A1, A0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HardwareAddress {
    #[default]
    A0,
    A1,
    A2,
    A3,
}

impl HardwareAddress {
    /// The raw A2..A0 value.
    pub const fn bits(self) -> u8 {
        match self {
            Self::A0 => 0,
            Self::A1 => 1,
            Self::A2 => 2,
            Self::A3 => 3,
        }
    }

    /// Control byte for a write transaction, `0x40`, `0x42`, `0x44` or `0x46`.
    pub const fn write_opcode(self) -> u8 {
        OPCODE | (self.bits() << 1)
    }

    pub const fn read_opcode(self) -> u8 {
        self.write_opcode() | OPCODE_READ
    }
}

impl TryFrom<u8> for HardwareAddress {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::A0),
            1 => Ok(Self::A1),
            2 => Ok(Self::A2),
            3 => Ok(Self::A3),
            other => Err(other),
        }
    }
}

/// Encode a register write.
pub const fn write_frame(address: HardwareAddress, reg: Register, value: u8) -> [u8; 3] {
    [address.write_opcode(), reg as u8, value]
}

/// Encode a register read. The data slot is clocked out as zero.
pub const fn read_frame(address: HardwareAddress, reg: Register) -> [u8; 3] {
    [address.read_opcode(), reg as u8, 0x00]
}

/// A failed register transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusError {
    pub register: Register,
    pub kind: ErrorKind,
}

/// Register-level access to one MCP23S17.
///
/// Each call is exactly one bus transaction. Implementations must not retry:
/// a failure is reported as-is and the caller decides what it means.
pub trait RegisterBus {
    fn write_reg(&mut self, reg: Register, value: u8) -> Result<(), BusError>;
    fn read_reg(&mut self, reg: Register) -> Result<u8, BusError>;

    /// Turn on hardware addressing by setting IOCON.HAEN.
    ///
    /// HAEN is cleared at power-on, in which state every chip on the bus
    /// answers to address 0 and ignores its strapping, so the write must go
    /// out on address 0 whatever address the bus was created for.
    fn enable_hardware_addressing(&mut self) -> Result<(), BusError>;
}

/// [`RegisterBus`] over any [`SpiDevice`].
///
/// The device owns chip-select; each frame is one CS-framed transaction.
pub struct Mcp23S17Bus<SPI> {
    spi: SPI,
    address: HardwareAddress,
}

impl<SPI: SpiDevice> Mcp23S17Bus<SPI> {
    pub fn new(spi: SPI, address: HardwareAddress) -> Self {
        Self { spi, address }
    }

    pub fn address(&self) -> HardwareAddress {
        self.address
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI: SpiDevice> RegisterBus for Mcp23S17Bus<SPI> {
    fn write_reg(&mut self, reg: Register, value: u8) -> Result<(), BusError> {
        self.spi
            .write(&write_frame(self.address, reg, value))
            .map_err(|e| BusError {
                register: reg,
                kind: e.kind(),
            })
    }

    fn read_reg(&mut self, reg: Register) -> Result<u8, BusError> {
        // Starts with outbound, is replaced with inbound
        let mut frame = read_frame(self.address, reg);
        self.spi
            .transfer_in_place(&mut frame)
            .map_err(|e| BusError {
                register: reg,
                kind: e.kind(),
            })?;
        Ok(frame[2])
    }

    fn enable_hardware_addressing(&mut self) -> Result<(), BusError> {
        self.spi
            .write(&write_frame(HardwareAddress::A0, Register::IOCONA, IOCON_HAEN))
            .map_err(|e| BusError {
                register: Register::IOCONA,
                kind: e.kind(),
            })
    }
}
