//! Simulation Calendar Types
//!
//! Half-hour ticks on a fixed 365-day year, with the day/month/quarter/year
//! boundary flags the scheduler reacts to.
//!
//! # Example
//!
//! ```
//! use bycatch_events::{Season, SimClock};
//!
//! let mut clock = SimClock::new(1);
//! assert!(clock.is_new_day());
//! assert!(clock.is_new_year());
//! assert_eq!(clock.season(), Season::Winter);
//!
//! for _ in 0..48 {
//!     clock.advance();
//! }
//! assert_eq!(clock.day_of_year(), 2);
//! assert!(clock.is_new_day());
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of half-hour ticks in a simulated day.
pub const TICKS_PER_DAY: u32 = 48;

/// Number of days in a simulated year.
pub const DAYS_PER_YEAR: u16 = 365;

/// Number of ticks in a simulated year.
pub const TICKS_PER_YEAR: u32 = TICKS_PER_DAY * DAYS_PER_YEAR as u32;

/// Last day of year of each month.
const MONTH_END: [u16; 12] = [31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];

/// Season of the year, one per calendar quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    /// January - March
    Winter,
    /// April - June
    Spring,
    /// July - September
    Summer,
    /// October - December
    Autumn,
}

impl Season {
    /// All seasons in calendar order.
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    /// Season for a calendar quarter (1-4).
    pub fn from_quarter(quarter: u8) -> Self {
        match quarter {
            1 => Season::Winter,
            2 => Season::Spring,
            3 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    /// Season for a day of year (1-365).
    pub fn from_day_of_year(day_of_year: u16) -> Self {
        Self::from_quarter(quarter_of_month(month_of_day(day_of_year)))
    }

    /// Zero-based index, used to address per-season tables.
    pub fn index(self) -> usize {
        match self {
            Season::Winter => 0,
            Season::Spring => 1,
            Season::Summer => 2,
            Season::Autumn => 3,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Winter => write!(f, "winter"),
            Season::Spring => write!(f, "spring"),
            Season::Summer => write!(f, "summer"),
            Season::Autumn => write!(f, "autumn"),
        }
    }
}

impl FromStr for Season {
    type Err = ParseDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "winter" => Ok(Season::Winter),
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "autumn" => Ok(Season::Autumn),
            _ => Err(ParseDateError::InvalidSeason(s.to_string())),
        }
    }
}

/// Month (1-12) containing a day of year (1-365).
pub fn month_of_day(day_of_year: u16) -> u8 {
    let day = day_of_year.clamp(1, DAYS_PER_YEAR);
    MONTH_END.iter().position(|&end| day <= end).unwrap_or(11) as u8 + 1
}

/// Quarter (1-4) containing a month (1-12).
pub fn quarter_of_month(month: u8) -> u8 {
    (month.clamp(1, 12) + 2) / 3
}

/// Wraps a (possibly out-of-range) day number into 1..=365.
pub fn wrap_day_of_year(day: i32) -> u16 {
    (day - 1).rem_euclid(DAYS_PER_YEAR as i32) as u16 + 1
}

/// Human-readable simulation date.
///
/// Serializes to strings like "year_3.day_042".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimDate {
    pub year: u32,
    pub day_of_year: u16,
}

impl SimDate {
    /// Creates a new SimDate.
    pub fn new(year: u32, day_of_year: u16) -> Self {
        Self { year, day_of_year }
    }

    pub fn month(&self) -> u8 {
        month_of_day(self.day_of_year)
    }

    pub fn day_of_month(&self) -> u8 {
        let month = self.month() as usize;
        let offset = if month == 1 { 0 } else { MONTH_END[month - 2] };
        (self.day_of_year - offset) as u8
    }

    pub fn season(&self) -> Season {
        Season::from_day_of_year(self.day_of_year)
    }
}

impl fmt::Display for SimDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "year_{}.day_{:03}", self.year, self.day_of_year)
    }
}

/// Error type for parsing SimDate from strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseDateError {
    InvalidFormat(String),
    InvalidYear(String),
    InvalidSeason(String),
    InvalidDay(String),
}

impl fmt::Display for ParseDateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseDateError::InvalidFormat(s) => {
                write!(f, "invalid date format: '{}', expected 'year_N.day_DDD'", s)
            }
            ParseDateError::InvalidYear(s) => write!(f, "invalid year: '{}'", s),
            ParseDateError::InvalidSeason(s) => write!(f, "invalid season: '{}'", s),
            ParseDateError::InvalidDay(s) => write!(f, "invalid day: '{}'", s),
        }
    }
}

impl std::error::Error for ParseDateError {}

impl FromStr for SimDate {
    type Err = ParseDateError;

    /// Parses a SimDate from a string like "year_3.day_042".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year_part, day_part) = s
            .split_once('.')
            .ok_or_else(|| ParseDateError::InvalidFormat(s.to_string()))?;

        let year = year_part
            .strip_prefix("year_")
            .ok_or_else(|| ParseDateError::InvalidFormat(s.to_string()))?
            .parse::<u32>()
            .map_err(|_| ParseDateError::InvalidYear(year_part.to_string()))?;

        let day_of_year = day_part
            .strip_prefix("day_")
            .ok_or_else(|| ParseDateError::InvalidFormat(s.to_string()))?
            .parse::<u16>()
            .map_err(|_| ParseDateError::InvalidDay(day_part.to_string()))?;

        if !(1..=DAYS_PER_YEAR).contains(&day_of_year) {
            return Err(ParseDateError::InvalidDay(day_part.to_string()));
        }

        Ok(SimDate { year, day_of_year })
    }
}

impl Serialize for SimDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SimDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A point in simulation time: the step counter plus the calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimTimestamp {
    /// Monotonically increasing simulation step (starts at 1).
    pub step: u64,
    /// Human-readable date.
    pub date: SimDate,
}

impl SimTimestamp {
    pub fn new(step: u64, year: u32, day_of_year: u16) -> Self {
        Self {
            step,
            date: SimDate::new(year, day_of_year),
        }
    }
}

/// Simulation clock.
///
/// Owns the calendar arithmetic; the scheduler only reads the boundary flags.
/// Flags describe the step the clock currently points at and are raised on
/// the first tick of each period.
#[derive(Debug, Clone)]
pub struct SimClock {
    step: u64,
    half_hour: u32,
    day: u32,
    day_of_year: u16,
    month: u8,
    year: u32,
    new_day: bool,
    new_month: bool,
    new_year: bool,
}

impl SimClock {
    /// Creates a clock positioned on the first tick of `start_day` (1-365).
    pub fn new(start_day: u16) -> Self {
        let day_of_year = start_day.clamp(1, DAYS_PER_YEAR);
        let month = month_of_day(day_of_year);
        let date = SimDate::new(1, day_of_year);

        Self {
            step: 1,
            half_hour: 1,
            day: 1,
            day_of_year,
            month,
            year: 1,
            new_day: true,
            new_month: date.day_of_month() == 1,
            new_year: day_of_year == 1,
        }
    }

    /// Moves to the next half-hour tick and returns the new step number.
    pub fn advance(&mut self) -> u64 {
        self.new_day = false;
        self.new_month = false;
        self.new_year = false;

        self.step += 1;
        self.half_hour += 1;

        if self.half_hour > TICKS_PER_DAY {
            self.half_hour = 1;
            self.day += 1;
            self.day_of_year += 1;
            self.new_day = true;

            if self.day_of_year > MONTH_END[self.month as usize - 1] {
                self.month += 1;
                self.new_month = true;
                if self.month > 12 {
                    self.month = 1;
                    self.day_of_year = 1;
                    self.year += 1;
                    self.new_year = true;
                }
            }
        }

        self.step
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Half-hour slot within the current day (1-48).
    pub fn half_hour(&self) -> u32 {
        self.half_hour
    }

    /// Cumulative simulation day, starting at 1.
    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn day_of_year(&self) -> u16 {
        self.day_of_year
    }

    pub fn day_of_month(&self) -> u8 {
        self.date().day_of_month()
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn quarter(&self) -> u8 {
        quarter_of_month(self.month)
    }

    pub fn season(&self) -> Season {
        Season::from_quarter(self.quarter())
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn date(&self) -> SimDate {
        SimDate::new(self.year, self.day_of_year)
    }

    pub fn timestamp(&self) -> SimTimestamp {
        SimTimestamp {
            step: self.step,
            date: self.date(),
        }
    }

    pub fn is_new_day(&self) -> bool {
        self.new_day
    }

    pub fn is_new_month(&self) -> bool {
        self.new_month
    }

    pub fn is_new_quarter(&self) -> bool {
        self.new_month && self.month % 3 == 1
    }

    pub fn is_new_year(&self) -> bool {
        self.new_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance_days(clock: &mut SimClock, days: u32) {
        for _ in 0..days * TICKS_PER_DAY {
            clock.advance();
        }
    }

    #[test]
    fn test_month_of_day() {
        assert_eq!(month_of_day(1), 1);
        assert_eq!(month_of_day(31), 1);
        assert_eq!(month_of_day(32), 2);
        assert_eq!(month_of_day(59), 2);
        assert_eq!(month_of_day(60), 3);
        assert_eq!(month_of_day(365), 12);
    }

    #[test]
    fn test_wrap_day_of_year() {
        assert_eq!(wrap_day_of_year(1), 1);
        assert_eq!(wrap_day_of_year(365), 365);
        assert_eq!(wrap_day_of_year(366), 1);
        assert_eq!(wrap_day_of_year(0), 365);
        assert_eq!(wrap_day_of_year(-64), 301);
        assert_eq!(wrap_day_of_year(465), 100);
    }

    #[test]
    fn test_season_of_day() {
        assert_eq!(Season::from_day_of_year(1), Season::Winter);
        assert_eq!(Season::from_day_of_year(91), Season::Spring);
        assert_eq!(Season::from_day_of_year(182), Season::Summer);
        assert_eq!(Season::from_day_of_year(274), Season::Autumn);
    }

    #[test]
    fn test_sim_date_parts() {
        let date = SimDate::new(2, 60);
        assert_eq!(date.month(), 3);
        assert_eq!(date.day_of_month(), 1);
        assert_eq!(date.to_string(), "year_2.day_060");
    }

    #[test]
    fn test_sim_date_parse() {
        let date: SimDate = "year_3.day_042".parse().unwrap();
        assert_eq!(date.year, 3);
        assert_eq!(date.day_of_year, 42);

        assert!("invalid".parse::<SimDate>().is_err());
        assert!("year_one.day_1".parse::<SimDate>().is_err());
        assert!("year_1.day_400".parse::<SimDate>().is_err());
    }

    #[test]
    fn test_sim_timestamp_serialization() {
        let ts = SimTimestamp::new(84729, 3, 12);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, r#"{"step":84729,"date":"year_3.day_012"}"#);
    }

    #[test]
    fn test_clock_start_flags() {
        let clock = SimClock::new(1);
        assert!(clock.is_new_day());
        assert!(clock.is_new_month());
        assert!(clock.is_new_quarter());
        assert!(clock.is_new_year());

        let clock = SimClock::new(100);
        assert!(clock.is_new_day());
        assert!(!clock.is_new_month());
        assert!(!clock.is_new_year());
        assert_eq!(clock.month(), 4);
        assert_eq!(clock.season(), Season::Spring);
    }

    #[test]
    fn test_clock_day_rollover() {
        let mut clock = SimClock::new(10);
        for _ in 0..TICKS_PER_DAY - 1 {
            clock.advance();
            assert!(!clock.is_new_day());
        }
        assert_eq!(clock.half_hour(), TICKS_PER_DAY);
        clock.advance();
        assert!(clock.is_new_day());
        assert_eq!(clock.day_of_year(), 11);
        assert_eq!(clock.day(), 2);
        assert_eq!(clock.step(), TICKS_PER_DAY as u64 + 1);
    }

    #[test]
    fn test_clock_month_and_quarter() {
        let mut clock = SimClock::new(31);
        advance_days(&mut clock, 1);
        assert!(clock.is_new_month());
        assert!(!clock.is_new_quarter());
        assert_eq!(clock.month(), 2);

        let mut clock = SimClock::new(90);
        advance_days(&mut clock, 1);
        assert!(clock.is_new_month());
        assert!(clock.is_new_quarter());
        assert_eq!(clock.season(), Season::Spring);
    }

    #[test]
    fn test_clock_year_rollover() {
        let mut clock = SimClock::new(365);
        clock.advance();
        assert!(!clock.is_new_year());
        advance_days(&mut clock, 1);
        // 47 ticks remained on day 365, so we're one tick into day 1
        assert_eq!(clock.day_of_year(), 1);
        assert_eq!(clock.year(), 2);
        assert!(!clock.is_new_year());

        let mut clock = SimClock::new(365);
        for _ in 0..TICKS_PER_DAY {
            clock.advance();
        }
        assert!(clock.is_new_year());
        assert!(clock.is_new_quarter());
        assert_eq!(clock.month(), 1);
    }

    #[test]
    fn test_full_year_cycle() {
        let mut clock = SimClock::new(1);
        let mut new_months = 1;
        let mut new_quarters = 1;
        for _ in 0..TICKS_PER_YEAR {
            clock.advance();
            if clock.is_new_month() {
                new_months += 1;
            }
            if clock.is_new_quarter() {
                new_quarters += 1;
            }
        }
        assert_eq!(clock.year(), 2);
        assert_eq!(clock.day_of_year(), 1);
        assert_eq!(new_months, 13);
        assert_eq!(new_quarters, 5);
    }
}
