//! Civil-day clock.
//!
//! Sessions roll over at local midnight of one fixed IANA zone, never at UTC
//! midnight, so every day boundary in the app comes from a `Clock`.

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    /// The current civil day
    fn today(&self) -> NaiveDate;

    /// Milliseconds since the Unix epoch, used to derive turn ids
    fn now_millis(&self) -> i64;
}

/// Wall clock anchored to a named timezone
#[derive(Debug, Clone)]
pub struct CivilClock {
    tz: Tz,
}

impl CivilClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let tz = Tz::from_str(name).map_err(|e| anyhow!("invalid IANA timezone '{}': {}", name, e))?;
        Ok(Self::new(tz))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl Default for CivilClock {
    fn default() -> Self {
        Self::new(chrono_tz::America::Mexico_City)
    }
}

impl Clock for CivilClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock pinned to one day; each `now_millis` call advances by one
pub struct FixedClock {
    day: NaiveDate,
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(day: NaiveDate, start_millis: i64) -> Self {
        Self {
            day,
            millis: AtomicI64::new(start_millis),
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.day
    }

    fn now_millis(&self) -> i64 {
        self.millis.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_name() {
        assert!(CivilClock::from_name("America/Mexico_City").is_ok());
        assert!(CivilClock::from_name("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn test_civil_day_differs_from_utc_day() {
        // 03:00 UTC is still the previous evening in Mexico City (UTC-6)
        let utc = Utc.with_ymd_and_hms(2025, 1, 2, 3, 0, 0).unwrap();
        let local = utc.with_timezone(&chrono_tz::America::Mexico_City).date_naive();
        assert_eq!(local, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 10);
        assert_eq!(clock.now_millis(), 10);
        assert_eq!(clock.now_millis(), 11);
    }
}
