//! Write a short hex payload to a serial port, for scoping baud timing and bit
//! patterns on real hardware.

pub mod ch341;
pub mod config;
pub mod error;
pub mod logging;
pub mod payload;
pub mod port;
pub mod sender;

pub use config::{PortSettings, Request, SenderConfig};
pub use error::{ConfigError, Error, Result, TransportError};
pub use payload::{BaudRate, Payload};
pub use port::{SerialTransport, Transport};
pub use sender::Sender;
