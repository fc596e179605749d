//! Actuator addressing and the one-byte command vocabulary.

use std::fmt;

/// Addressable remote lamp controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceId {
    Device1,
    Device2,
}

impl DeviceId {
    /// All devices in dispatch order.
    pub const ALL: [DeviceId; 2] = [DeviceId::Device1, DeviceId::Device2];

    /// 1-based device number as used on the command line and in logs.
    pub fn number(self) -> u8 {
        match self {
            DeviceId::Device1 => 1,
            DeviceId::Device2 => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(DeviceId::Device1),
            2 => Some(DeviceId::Device2),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device{}", self.number())
    }
}

/// Lamp command. Serialized as a single ASCII byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    TurnOn,
    TurnOff,
}

impl Command {
    /// Wire encoding: `'0'` turns the lamp on, `'1'` turns it off.
    pub fn wire_byte(self) -> u8 {
        match self {
            Command::TurnOn => b'0',
            Command::TurnOff => b'1',
        }
    }

    pub fn from_wire_byte(b: u8) -> Option<Self> {
        match b {
            b'0' => Some(Command::TurnOn),
            b'1' => Some(Command::TurnOff),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::TurnOn => f.write_str("on"),
            Command::TurnOff => f.write_str("off"),
        }
    }
}

/// Free-form device reply. Only ever logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply(pub Vec<u8>);

impl Reply {
    /// Lossy UTF-8 rendering for logs.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}
