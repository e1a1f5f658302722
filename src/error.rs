use core::fmt;

use embedded_hal::spi::ErrorKind;
use thiserror::Error;

use crate::dev::mcp23s17::{BusError, Register};
use crate::LogicalPin;

/// What the driver was doing when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Init,
    SetMode(LogicalPin),
    Mode(LogicalPin),
    Write(LogicalPin),
    Read(LogicalPin),
    SetPullResistance(LogicalPin),
    PullResistance(LogicalPin),
    Provision(LogicalPin),
    Unexport(LogicalPin),
    Wait(LogicalPin),
    Poll,
    Dispose,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Init => f.write_str("init"),
            Operation::SetMode(pin) => write!(f, "set_mode({pin})"),
            Operation::Mode(pin) => write!(f, "mode({pin})"),
            Operation::Write(pin) => write!(f, "write({pin})"),
            Operation::Read(pin) => write!(f, "read({pin})"),
            Operation::SetPullResistance(pin) => write!(f, "set_pull_resistance({pin})"),
            Operation::PullResistance(pin) => write!(f, "pull_resistance({pin})"),
            Operation::Provision(pin) => write!(f, "provision({pin})"),
            Operation::Unexport(pin) => write!(f, "unexport({pin})"),
            Operation::Wait(pin) => write!(f, "wait({pin})"),
            Operation::Poll => f.write_str("poll"),
            Operation::Dispose => f.write_str("dispose"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The bus transaction failed. Never retried.
    #[error("{op}: transaction on {register:?} failed: {kind}")]
    Transport {
        op: Operation,
        register: Register,
        kind: ErrorKind,
    },

    /// The pin value is not a member of port A or port B.
    #[error("{op}: not a port A or port B pin")]
    InvalidPin { op: Operation },

    /// The driver has been disposed.
    #[error("{op}: driver has been disposed")]
    Disposed { op: Operation },

    /// The chip cannot do what was asked.
    #[error("{op}: {what} is not supported by the MCP23S17")]
    Unsupported { op: Operation, what: &'static str },
}

impl Error {
    pub(crate) fn transport(op: Operation) -> impl FnOnce(BusError) -> Self {
        move |e| Error::Transport {
            op,
            register: e.register,
            kind: e.kind,
        }
    }

    /// The operation that failed.
    pub fn operation(&self) -> Operation {
        match *self {
            Error::Transport { op, .. }
            | Error::InvalidPin { op }
            | Error::Disposed { op }
            | Error::Unsupported { op, .. } => op,
        }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
