use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use sendserial::{ch341, Request, Sender, SenderConfig, SerialTransport};
use tracing::{debug, warn};

/// Write a hex payload to a serial port.
///
/// The default payload, a single 0x00, shows up on the line as one low pulse
/// of nine bit times (start bit plus eight data bits); measure it to check the
/// real baud rate. Use "55 55 55 55" to see every single bit.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Baud rate [default: 921600]
    baud: Option<String>,

    /// Payload as hex byte pairs, optionally separated by whitespace, e.g. "00 55 AA" [default: 00]
    data: Option<String>,

    /// Serial device to write to [default: /dev/ttyUSB0]
    #[arg(short, long, env = "SENDSERIAL_DEVICE")]
    device: Option<String>,

    /// Delay between opening the port and writing, in milliseconds [default: 1000]
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Also print the rate a CH341 adapter actually generates for this baud rate
    #[arg(long)]
    ch341: bool,
}

impl Args {
    fn request(&self) -> Request {
        Request {
            baud_rate: self.baud.clone(),
            payload: self.data.clone(),
            device: self.device.clone(),
            settle_delay: self.settle_ms.map(Duration::from_millis),
        }
    }
}

fn report_ch341(config: &SenderConfig) {
    match ch341::estimate(config.baud_rate().get()) {
        Ok(estimate) => {
            println!("{}", estimate);
            if !estimate.is_usable() {
                warn!(
                    "CH341 error of {:+.2}% exceeds {}%",
                    estimate.error_percent,
                    ch341::ERROR_LIMIT_PERCENT
                );
            }
        }
        Err(e) => warn!("{}", e),
    }
}

fn main() -> ExitCode {
    sendserial::logging::init();

    let args = Args::parse();

    let config = match SenderConfig::resolve(&args.request()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return e.exit_code();
        }
    };

    println!("{}", config.status_line());
    debug!(pulse = ?config.baud_rate().start_pulse_width(), "expected 0x00 low pulse");
    if args.ch341 {
        report_ch341(&config);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(Sender::new(SerialTransport).send(&config));
    // a drain stuck in the kernel must not hold up the exit
    runtime.shutdown_background();

    match result {
        Ok(written) => {
            debug!(written, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            e.exit_code()
        }
    }
}
