//! Monotonic clock producing `seconds.nanoseconds` timestamps.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::ParseError;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A point in time or a span, split into whole seconds and nanoseconds.
///
/// `nanos` is always below one second. Displayed as `<secs>.<nanos>` with the
/// nanoseconds zero padded to nine digits, which is also the form `FromStr`
/// accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespec {
    secs: u64,
    nanos: u32,
}

impl Timespec {
    /// The zero timestamp / empty span.
    pub const ZERO: Timespec = Timespec { secs: 0, nanos: 0 };

    /// Create a `Timespec`, carrying excess nanoseconds into the seconds.
    #[must_use]
    pub const fn new(secs: u64, nanos: u32) -> Self {
        Timespec {
            secs: secs + (nanos / NANOS_PER_SEC) as u64,
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    /// Whole seconds.
    #[must_use]
    pub const fn secs(&self) -> u64 {
        self.secs
    }

    /// Sub-second part in nanoseconds.
    #[must_use]
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    /// `self - earlier`, borrowing one second when the nanoseconds would go negative.
    /// Returns `None` when `earlier` is later than `self`.
    #[must_use]
    pub fn checked_sub(&self, earlier: Timespec) -> Option<Timespec> {
        if self.nanos >= earlier.nanos {
            Some(Timespec {
                secs: self.secs.checked_sub(earlier.secs)?,
                nanos: self.nanos - earlier.nanos,
            })
        } else {
            Some(Timespec {
                secs: self.secs.checked_sub(earlier.secs)?.checked_sub(1)?,
                nanos: self.nanos + NANOS_PER_SEC - earlier.nanos,
            })
        }
    }

    /// The span from `start` to `self`, zero when the clock appears to have run backwards.
    #[must_use]
    pub fn since(&self, start: Timespec) -> Timespec {
        self.checked_sub(start).unwrap_or(Timespec::ZERO)
    }
}

impl From<Duration> for Timespec {
    fn from(duration: Duration) -> Self {
        Timespec {
            secs: duration.as_secs(),
            nanos: duration.subsec_nanos(),
        }
    }
}

impl From<Timespec> for Duration {
    fn from(ts: Timespec) -> Self {
        Duration::new(ts.secs, ts.nanos)
    }
}

impl fmt::Display for Timespec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}

impl FromStr for Timespec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseError::Timespec(s.to_string());

        let (secs, nanos) = s.split_once('.').ok_or_else(invalid)?;
        if nanos.len() != 9 || !nanos.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let secs = secs.parse().map_err(|_| invalid())?;
        let nanos = nanos.parse().map_err(|_| invalid())?;
        Ok(Timespec { secs, nanos })
    }
}

/// Monotonic time source anchored to the wall clock.
///
/// The anchor is taken once at construction; every `now()` afterwards is the
/// anchor plus the monotonic time elapsed since, so timestamps read like
/// `CLOCK_REALTIME` but never go backwards.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    wall: Duration,
    origin: Instant,
}

impl Clock {
    /// Anchor a new clock at the current time.
    #[must_use]
    pub fn new() -> Self {
        let origin = Instant::now();
        // A wall clock before the epoch only shifts the anchor; spans stay exact.
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Clock { wall, origin }
    }

    /// Current timestamp.
    #[must_use]
    #[inline]
    pub fn now(&self) -> Timespec {
        Timespec::from(self.wall + self.origin.elapsed())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_without_borrow() {
        let start = Timespec::new(10, 100);
        let end = Timespec::new(12, 300);
        assert_eq!(end.since(start), Timespec::new(2, 200));
    }

    #[test]
    fn sub_with_borrow() {
        let start = Timespec::new(10, 900_000_000);
        let end = Timespec::new(11, 100_000_000);
        assert_eq!(end.since(start), Timespec::new(0, 200_000_000));
    }

    #[test]
    fn sub_backwards() {
        let start = Timespec::new(5, 1);
        let end = Timespec::new(5, 0);
        assert_eq!(end.checked_sub(start), None);
        assert_eq!(end.since(start), Timespec::ZERO);
    }

    #[test]
    fn new_carries() {
        assert_eq!(Timespec::new(1, 2_500_000_000), Timespec::new(3, 500_000_000));
    }

    #[test]
    fn display_pads_nanos() {
        assert_eq!(Timespec::new(3, 42).to_string(), "3.000000042");
        assert_eq!(Timespec::ZERO.to_string(), "0.000000000");
    }

    #[test]
    fn parse() {
        assert_eq!(
            "1660000000.000000042".parse::<Timespec>().unwrap(),
            Timespec::new(1_660_000_000, 42)
        );
        assert!("1.42".parse::<Timespec>().is_err());
        assert!("1".parse::<Timespec>().is_err());
        assert!("x.000000001".parse::<Timespec>().is_err());
        assert!("1.-00000001".parse::<Timespec>().is_err());
    }

    #[test]
    fn clock_is_monotonic() {
        let clock = Clock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(a.secs() > 0);
    }
}
