use std::time::Duration;

use tokio_serial::FlowControl;

use crate::error::Result;
use crate::payload::{BaudRate, Payload};

/// USB-serial adapter the tool talks to unless told otherwise.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

pub const READ_TIMEOUT: Duration = Duration::from_secs(2);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);
pub const INTER_BYTE_TIMEOUT: Duration = Duration::from_millis(200);

/// Pause between opening the port and writing, giving the adapter and its
/// driver time to settle. Whether the hardware needs the full second is not
/// known, so it stays the default and can be overridden.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Everything needed to open the device. Read and inter-byte timeouts are part
/// of the port configuration even though the sender never reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSettings {
    pub path: String,
    pub baud_rate: BaudRate,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub inter_byte_timeout: Duration,
    pub flow_control: FlowControl,
    /// DSR/DTR handshaking.
    pub dsr_dtr: bool,
}

impl PortSettings {
    pub fn new(path: impl Into<String>, baud_rate: BaudRate) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            read_timeout: READ_TIMEOUT,
            write_timeout: WRITE_TIMEOUT,
            inter_byte_timeout: INTER_BYTE_TIMEOUT,
            flow_control: FlowControl::None,
            dsr_dtr: false,
        }
    }
}

/// Raw, unvalidated input as it arrives from the command line.
#[derive(Clone, Debug, Default)]
pub struct Request {
    pub baud_rate: Option<String>,
    pub payload: Option<String>,
    pub device: Option<String>,
    pub settle_delay: Option<Duration>,
}

/// A fully resolved send. Built once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderConfig {
    pub payload: Payload,
    pub port: PortSettings,
    pub settle_delay: Duration,
}

impl SenderConfig {
    /// Applies the overrides in `request` on top of the defaults. Fails on bad
    /// baud or payload text without touching any device.
    pub fn resolve(request: &Request) -> Result<Self> {
        let baud_rate = match &request.baud_rate {
            Some(text) => text.parse()?,
            None => BaudRate::DEFAULT,
        };
        let payload = Payload::parse_hex(
            request
                .payload
                .as_deref()
                .unwrap_or(Payload::DEFAULT_HEX),
        )?;
        let device = request.device.as_deref().unwrap_or(DEFAULT_DEVICE);

        Ok(Self {
            payload,
            port: PortSettings::new(device, baud_rate),
            settle_delay: request.settle_delay.unwrap_or(SETTLE_DELAY),
        })
    }

    pub fn baud_rate(&self) -> BaudRate {
        self.port.baud_rate
    }

    pub fn status_line(&self) -> String {
        format!("baudrate={} data={}", self.port.baud_rate, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(baud: Option<&str>, payload: Option<&str>) -> Request {
        Request {
            baud_rate: baud.map(str::to_owned),
            payload: payload.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let config = SenderConfig::resolve(&Request::default()).unwrap();
        assert_eq!(config.baud_rate().get(), 921_600);
        assert_eq!(config.payload.as_bytes(), &[0x00]);
        assert_eq!(config.port.path, DEFAULT_DEVICE);
        assert_eq!(config.port.read_timeout, Duration::from_secs(2));
        assert_eq!(config.port.write_timeout, Duration::from_secs(2));
        assert_eq!(config.port.inter_byte_timeout, Duration::from_millis(200));
        assert_eq!(config.port.flow_control, FlowControl::None);
        assert!(!config.port.dsr_dtr);
        assert_eq!(config.settle_delay, Duration::from_secs(1));
    }

    #[test]
    fn overrides() {
        let config = SenderConfig::resolve(&Request {
            device: Some("/dev/ttyAMA0".into()),
            settle_delay: Some(Duration::ZERO),
            ..request(Some("9600"), Some("55 55 55 55"))
        })
        .unwrap();
        assert_eq!(config.baud_rate().get(), 9600);
        assert_eq!(config.payload.as_bytes(), &[0x55, 0x55, 0x55, 0x55]);
        assert_eq!(config.port.path, "/dev/ttyAMA0");
        assert_eq!(config.settle_delay, Duration::ZERO);
    }

    #[test]
    fn baud_alone_keeps_default_payload() {
        let config = SenderConfig::resolve(&request(Some("38400"), None)).unwrap();
        assert_eq!(config.baud_rate().get(), 38400);
        assert_eq!(config.payload.as_bytes(), &[0x00]);
    }

    #[test]
    fn bad_input_is_a_config_error() {
        let err = SenderConfig::resolve(&request(Some("fast"), None)).unwrap_err();
        assert!(err.is_configuration());
        let err = SenderConfig::resolve(&request(None, Some("ABC"))).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn status_line() {
        let config = SenderConfig::resolve(&request(Some("9600"), Some("00 55 aa"))).unwrap();
        assert_eq!(config.status_line(), "baudrate=9600 data=00 55 AA");
    }
}
