use clap::Parser;
use sendserial::ch341::{self, Ch341Error, Ch341Estimate};

/// Compare the legacy and current CH341 baud register calculations.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Summarize every rate in START..END instead of printing the standard table
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    range: Option<Vec<u32>>,
}

fn column(estimate: &Result<Ch341Estimate, Ch341Error>) -> (String, String) {
    match estimate {
        Ok(e) => (
            format!("{:+.2}%", e.error_percent),
            format!("{}/{}", e.divisor.prescaler(), e.divisor.divisor()),
        ),
        Err(_) => ("-".to_owned(), "-".to_owned()),
    }
}

fn print_table() {
    for baud in ch341::STANDARD_BAUD_RATES {
        let (legacy_error, legacy_div) = column(&ch341::legacy_estimate(baud));
        let (error, div) = column(&ch341::estimate(baud));
        println!(
            "baud={:<8}\terrorOrig={:<8}\terrorNew={:<8}\tpre/divOrig={:<9}\tpre/divNew={}",
            baud, legacy_error, error, legacy_div, div
        );
    }
}

fn main() {
    sendserial::logging::init();

    let args = Args::parse();

    match args.range.as_deref() {
        Some(&[start, end]) => {
            tracing::info!(start, end, "comparing range");
            let summary = ch341::compare_range(start..end);
            println!(
                "newBetter:{}, origBetter:{}, badCounter:{}",
                summary.new_better, summary.legacy_better, summary.unusable
            );
        }
        _ => print_table(),
    }
}
