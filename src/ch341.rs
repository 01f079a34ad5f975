//! Baud rate generator of the WCH CH341 USB-serial bridge.
//!
//! The chip derives its line clock from a 12 MHz oscillator through a
//! prescaler and an 8-bit divisor. Not every requested rate is reachable, so
//! when scoping the pulses of a CH341 adapter it helps to know what the chip
//! will really put on the wire. Two register calculations are provided: the
//! one older Linux drivers shipped, and a prescaler search that lands much
//! closer to the requested rate at high speeds.

use std::fmt;
use std::ops::Range;

const OSC_HZ: u64 = 12_000_000;

/// Set in the prescaler register so the chip sends immediately instead of
/// buffering up to a full 32 byte USB packet.
const NO_BUFFERING: u8 = 0x80;

const LEGACY_BAUDBASE_FACTOR: u64 = 1_532_620_800;
const LEGACY_DIVMAX: u8 = 3;
const LEGACY_FACTOR_MAX: u64 = 0xfff0;

pub const MIN_BAUD: u32 = 46;
pub const MAX_BAUD: u32 = 3_030_000;

/// Errors above this (in percent) are unlikely to work with a receiver
/// clocked at the nominal rate.
pub const ERROR_LIMIT_PERCENT: f64 = 0.8;

/// (register value, division) in search order, smallest division first.
const PRESCALERS: [(u8, u32); 8] = [
    (7, 1),
    (3, 2),
    (6, 8),
    (2, 16),
    (5, 64),
    (1, 128),
    (4, 512),
    (0, 1024),
];

/// The three low prescaler register bits each bypass one stage of the
/// chained x2, x8 and x64 prescalers.
const PRESCALER_BY_REG: [u32; 8] = [1024, 128, 16, 2, 512, 64, 8, 1];

/// Common rates, as checked against both register calculations.
pub const STANDARD_BAUD_RATES: [u32; 43] = [
    46, 50, 75, 110, 135, 150, 300, 600, 1200, 1800, 2400, 4800, 7200, 9600, 14400, 19200, 31250,
    38400, 45450, 56000, 57600, 76800, 100000, 115200, 128000, 153846, 187500, 230400, 250000,
    256000, 307200, 460800, 500000, 750000, 857143, 921600, 1000000, 1090909, 1200000, 1333333,
    1500000, 2000000, 3000000,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Ch341Error {
    #[error("{0} Bd is outside the CH341 range")]
    OutOfRange(u32),

    #[error("no prescaler/divisor pair reaches {0} Bd")]
    NoDivisor(u32),
}

/// Raw values for the BPS_PRE (0x12) and BPS_DIV (0x13) registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ch341Divisor {
    pub prescaler_reg: u8,
    pub divisor_reg: u8,
}

impl Ch341Divisor {
    pub fn prescaler(&self) -> u32 {
        PRESCALER_BY_REG[(self.prescaler_reg & 0x07) as usize]
    }

    /// Effective clock division of the divisor register.
    pub fn divisor(&self) -> u32 {
        let div = 256 - self.divisor_reg as u32;
        if div == 1 {
            // measured on hardware
            78
        } else if self.prescaler() == 1 && (2..=8).contains(&div) {
            div * 2
        } else {
            div
        }
    }

    pub fn actual_baud(&self) -> f64 {
        OSC_HZ as f64 / (self.prescaler() * self.divisor()) as f64
    }
}

/// Picks the smallest prescaler that leaves the divisor in range, which keeps
/// the most divisor resolution.
pub fn divisor(baud: u32) -> Result<Ch341Divisor, Ch341Error> {
    if !(MIN_BAUD..=MAX_BAUD).contains(&baud) {
        return Err(Ch341Error::OutOfRange(baud));
    }

    for (reg, prescaler) in PRESCALERS {
        let div = ((2 * OSC_HZ) / (prescaler as u64 * baud as u64) + 1) / 2;
        // with the prescaler bypassed, divisors 2 to 8 really divide by 4 to 16
        if prescaler == 1 && div <= 8 {
            continue;
        }
        if (2..=256).contains(&div) {
            return Ok(Ch341Divisor {
                prescaler_reg: reg | NO_BUFFERING,
                divisor_reg: (256 - div) as u8,
            });
        }
    }

    Err(Ch341Error::NoDivisor(baud))
}

/// Register values as computed by the older driver formula.
pub fn legacy_divisor(baud: u32) -> Result<Ch341Divisor, Ch341Error> {
    if baud == 0 {
        return Err(Ch341Error::OutOfRange(baud));
    }

    let mut factor = LEGACY_BAUDBASE_FACTOR / baud as u64;
    let mut divisor = LEGACY_DIVMAX;
    while factor > LEGACY_FACTOR_MAX && divisor > 0 {
        factor >>= 3;
        divisor -= 1;
    }
    if factor > LEGACY_FACTOR_MAX {
        return Err(Ch341Error::OutOfRange(baud));
    }

    let factor = 0x10000 - factor;
    Ok(Ch341Divisor {
        prescaler_reg: divisor | NO_BUFFERING,
        divisor_reg: ((factor & 0xff00) >> 8) as u8,
    })
}

pub fn baud_error_percent(requested: u32, actual: f64) -> f64 {
    (actual / requested as f64 - 1.0) * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ch341Estimate {
    pub requested: u32,
    pub divisor: Ch341Divisor,
    pub actual: f64,
    pub error_percent: f64,
}

impl Ch341Estimate {
    pub fn new(requested: u32, divisor: Ch341Divisor) -> Self {
        let actual = divisor.actual_baud();
        Self {
            requested,
            divisor,
            actual,
            error_percent: baud_error_percent(requested, actual),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.error_percent.abs() <= ERROR_LIMIT_PERCENT
    }
}

impl fmt::Display for Ch341Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ch341: requested={} actual={:.2} error={:+.2}% prescaler={} divisor={}",
            self.requested,
            self.actual,
            self.error_percent,
            self.divisor.prescaler(),
            self.divisor.divisor()
        )
    }
}

/// What the adapter produces for `baud` with the current register search.
pub fn estimate(baud: u32) -> Result<Ch341Estimate, Ch341Error> {
    Ok(Ch341Estimate::new(baud, divisor(baud)?))
}

pub fn legacy_estimate(baud: u32) -> Result<Ch341Estimate, Ch341Error> {
    Ok(Ch341Estimate::new(baud, legacy_divisor(baud)?))
}

/// Tally of [`compare_range`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeSummary {
    pub new_better: u64,
    pub legacy_better: u64,
    pub unusable: u64,
}

fn abs_error(estimate: &Result<Ch341Estimate, Ch341Error>) -> f64 {
    match estimate {
        Ok(e) => e.error_percent.abs(),
        Err(_) => f64::INFINITY,
    }
}

/// Compares both calculations over every rate in `range`. Differences under
/// 0.01 percentage points count as a tie. `unusable` counts rates where the
/// current calculation misses by more than [`ERROR_LIMIT_PERCENT`].
pub fn compare_range(range: Range<u32>) -> RangeSummary {
    let mut summary = RangeSummary::default();
    for baud in range {
        let legacy = abs_error(&legacy_estimate(baud));
        let current = abs_error(&estimate(baud));

        let tie = current.is_finite() && legacy.is_finite() && (legacy - current).abs() <= 0.01;
        if !tie && legacy < current {
            summary.legacy_better += 1;
        } else if !tie && current < legacy {
            summary.new_better += 1;
        }

        if current > ERROR_LIMIT_PERCENT {
            summary.unusable += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn divisor_9600() {
        let d = divisor(9600).unwrap();
        assert_eq!(d, Ch341Divisor { prescaler_reg: 0x86, divisor_reg: 100 });
        assert_eq!(d.prescaler(), 8);
        assert_eq!(d.divisor(), 156);
        let e = estimate(9600).unwrap();
        assert!(close(e.actual, 9615.3846, 1e-3));
        assert!(close(e.error_percent, 0.1603, 1e-3));
        assert!(e.is_usable());
    }

    #[test]
    fn divisor_921600() {
        let d = divisor(921_600).unwrap();
        assert_eq!(d, Ch341Divisor { prescaler_reg: 0x87, divisor_reg: 243 });
        assert_eq!(d.prescaler(), 1);
        assert_eq!(d.divisor(), 13);
        assert!(close(d.actual_baud(), 923_076.923, 1e-2));
    }

    #[test]
    fn legacy_921600_is_far_off() {
        let d = legacy_divisor(921_600).unwrap();
        assert_eq!(d, Ch341Divisor { prescaler_reg: 0x83, divisor_reg: 0xf9 });
        let e = legacy_estimate(921_600).unwrap();
        assert!(close(e.actual, 857_142.857, 1e-2));
        assert!(close(e.error_percent, -6.994, 1e-2));
        assert!(!e.is_usable());
    }

    #[test]
    fn legacy_9600_matches_current() {
        let legacy = legacy_estimate(9600).unwrap();
        assert_eq!(legacy.divisor.prescaler(), 16);
        assert_eq!(legacy.divisor.divisor(), 78);
        assert!(close(legacy.actual, estimate(9600).unwrap().actual, 1e-6));
    }

    #[test]
    fn out_of_range() {
        assert_eq!(divisor(45), Err(Ch341Error::OutOfRange(45)));
        assert_eq!(divisor(3_030_001), Err(Ch341Error::OutOfRange(3_030_001)));
        assert_eq!(legacy_divisor(0), Err(Ch341Error::OutOfRange(0)));
        assert_eq!(legacy_divisor(45), Err(Ch341Error::OutOfRange(45)));
        assert!(legacy_divisor(46).is_ok());
    }

    #[test]
    fn standard_rates_all_have_a_divisor() {
        for baud in STANDARD_BAUD_RATES {
            assert!(divisor(baud).is_ok(), "{baud}");
            assert!(legacy_divisor(baud).is_ok(), "{baud}");
        }
    }

    #[test]
    fn current_never_loses_below_100k() {
        let summary = compare_range(MIN_BAUD..100_000);
        assert_eq!(summary.legacy_better, 0);
        assert_eq!(summary.unusable, 0);
        assert_eq!(summary.new_better, 44_653);
    }

    #[test]
    fn display() {
        let text = estimate(9600).unwrap().to_string();
        assert_eq!(
            text,
            "ch341: requested=9600 actual=9615.38 error=+0.16% prescaler=8 divisor=156"
        );
    }
}
