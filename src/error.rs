// Introspection error handling

use crate::context::StackKind;
use crate::zone::ZoneId;
use crate::Address;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntrospectError {
    // Fatal: the layer cannot continue past these
    Attribution { stack: StackKind, address: Address },
    CorruptChain { frame: Address, previous: Address },
    ZoneRead { zone: ZoneId, address: Address },
    UnknownZone(ZoneId),
    Unmapped(Address),

    // Recoverable, only raised while loading configuration
    Config(String),
}

impl IntrospectError {
    /// Attribution and chain errors mean the stacks are corrupt; the
    /// machine must abort with the diagnostic rather than resume.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IntrospectError::Config(_))
    }
}

impl fmt::Display for IntrospectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntrospectError::Attribution { stack, address } => {
                write!(
                    f,
                    "{} stack pointer 0x{:x} is not in any context",
                    stack, address
                )
            }
            IntrospectError::CorruptChain { frame, previous } => {
                write!(
                    f,
                    "corrupt choice-point chain: frame 0x{:x} links to 0x{:x}",
                    frame, previous
                )
            }
            IntrospectError::ZoneRead { zone, address } => {
                write!(f, "address 0x{:x} is outside zone {}", address, zone)
            }
            IntrospectError::UnknownZone(zone) => {
                write!(f, "zone {} is not registered", zone)
            }
            IntrospectError::Unmapped(address) => {
                write!(f, "address 0x{:x} is not in any zone", address)
            }
            IntrospectError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for IntrospectError {}

impl From<toml::de::Error> for IntrospectError {
    fn from(error: toml::de::Error) -> Self {
        IntrospectError::Config(error.to_string())
    }
}

impl From<std::io::Error> for IntrospectError {
    fn from(error: std::io::Error) -> Self {
        IntrospectError::Config(format!("I/O error: {}", error))
    }
}
