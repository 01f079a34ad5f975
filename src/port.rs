use std::io::Write;

use tokio_serial::{DataBits, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::config::PortSettings;
use crate::error::TransportError;

/// Something that can open a writable port. The returned handle closes the
/// device when dropped.
///
/// Ports are blocking: a flush waits until the transmit queue has drained, so
/// the sender drives them from the blocking pool.
pub trait Transport {
    type Port: Write + Send + 'static;

    fn open(&self, settings: &PortSettings) -> Result<Self::Port, TransportError>;
}

/// Real serial device opened through `tokio_serial`. Always 8-N-1.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialTransport;

impl Transport for SerialTransport {
    type Port = Box<dyn SerialPort>;

    fn open(&self, settings: &PortSettings) -> Result<Box<dyn SerialPort>, TransportError> {
        // serialport only knows RTS/CTS and XON/XOFF
        if settings.dsr_dtr {
            return Err(TransportError::Unsupported {
                path: settings.path.clone(),
                what: "DSR/DTR handshaking",
            });
        }

        // No reads happen, so the inter-byte timeout has nothing to apply to.
        debug!(
            path = %settings.path,
            baud = settings.baud_rate.get(),
            read_timeout = ?settings.read_timeout,
            inter_byte_timeout = ?settings.inter_byte_timeout,
            "opening serial port"
        );

        tokio_serial::new(settings.path.as_str(), settings.baud_rate.get())
            .timeout(settings.read_timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(settings.flow_control)
            .open()
            .map_err(|e| TransportError::Open {
                path: settings.path.clone(),
                source: e.into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::BaudRate;

    #[test]
    fn dsr_dtr_is_refused_before_opening() {
        let mut settings = PortSettings::new("/dev/does-not-exist", BaudRate::DEFAULT);
        settings.dsr_dtr = true;
        let err = SerialTransport.open(&settings).err().expect("open should fail");
        assert!(matches!(err, TransportError::Unsupported { .. }));
    }

    #[test]
    fn missing_device_fails_to_open() {
        let settings = PortSettings::new("/dev/sendserial-no-such-port", BaudRate::DEFAULT);
        let err = SerialTransport.open(&settings).err().expect("open should fail");
        assert!(matches!(
            err,
            TransportError::Open { ref path, .. } if path == "/dev/sendserial-no-such-port"
        ));
    }
}
