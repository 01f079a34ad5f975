use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Line speed in bits per second. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BaudRate(u32);

impl BaudRate {
    pub const DEFAULT: BaudRate = BaudRate(921_600);

    pub fn new(bps: u32) -> Option<Self> {
        (bps != 0).then_some(Self(bps))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Duration of a single bit on the wire.
    pub fn bit_time(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.0 as f64)
    }

    /// Width of the low pulse a 0x00 byte produces with 8-N-1 framing: the
    /// start bit plus eight zero data bits. Measure it on a scope and the real
    /// line speed is `9 / width`.
    pub fn start_pulse_width(self) -> Duration {
        Duration::from_secs_f64(9.0 / self.0 as f64)
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for BaudRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(BaudRate::new)
            .ok_or_else(|| ConfigError::InvalidBaudRate(s.to_owned()))
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The bytes to put on the wire, in order.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Text form of the default payload: one zero byte, which shows up on the
    /// line as a single nine-bit low pulse.
    pub const DEFAULT_HEX: &'static str = "00";

    /// Decodes hex byte pairs. Whitespace may separate groups but a group must
    /// hold whole bytes, so `"AABB CC"` is fine and `"A ABB"` is not.
    pub fn parse_hex(input: &str) -> Result<Self, ConfigError> {
        let mut bytes = Vec::with_capacity(input.len() / 2);
        for group in input.split_whitespace() {
            let decoded = hex::decode(group).map_err(|source| ConfigError::InvalidPayload {
                input: input.to_owned(),
                source,
            })?;
            bytes.extend_from_slice(&decoded);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Upper case hex, one space between bytes: `"00 55 AA"`.
    pub fn to_hex(&self) -> String {
        self.0
            .iter()
            .map(|b| hex::encode_upper([*b]))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl FromStr for Payload {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
