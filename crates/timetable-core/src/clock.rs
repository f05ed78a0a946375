use crate::error::TimetableError;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Wall-clock time of day stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn new(hours: u16, minutes: u16) -> Result<Self, TimetableError> {
        if hours >= 24 || minutes >= 60 {
            return Err(TimetableError::InvalidClockTime(format!(
                "{hours:02}:{minutes:02}"
            )));
        }
        Ok(Self(hours * 60 + minutes))
    }

    pub fn from_minutes(minutes: u16) -> Result<Self, TimetableError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(TimetableError::InvalidClockTime(format!(
                "{minutes} minutes"
            )));
        }
        Ok(Self(minutes))
    }

    /// Caller guarantees `minutes < 1440`.
    pub(crate) const fn from_minutes_unchecked(minutes: u16) -> Self {
        Self(minutes)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hours(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Dotted rendering used in exported sheets, e.g. `07.35`.
    pub fn dotted(self) -> String {
        format!("{:02}.{:02}", self.hours(), self.minute())
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Always in range: hours < 24 and minutes < 60 by construction.
        NaiveTime::from_hms_opt(u32::from(self.hours()), u32::from(self.minute()), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for ClockTime {
    fn from(value: NaiveTime) -> Self {
        Self((value.hour() * 60 + value.minute()) as u16)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || TimetableError::InvalidClockTime(s.to_string());
        let (hours, minutes) = trimmed
            .split_once(':')
            .or_else(|| trimmed.split_once('.'))
            .ok_or_else(invalid)?;
        if hours.is_empty() || minutes.len() != 2 {
            return Err(invalid());
        }
        let hours = hours.parse::<u16>().map_err(|_| invalid())?;
        let minutes = minutes.parse::<u16>().map_err(|_| invalid())?;
        Self::new(hours, minutes).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = TimetableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_and_dotted_forms() {
        let colon: ClockTime = "07:35".parse().unwrap();
        let dotted: ClockTime = " 07.35 ".parse().unwrap();
        assert_eq!(colon, dotted);
        assert_eq!(colon.minutes(), 7 * 60 + 35);
        assert_eq!(colon.to_string(), "07:35");
        assert_eq!(colon.dotted(), "07.35");
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!("24:00".parse::<ClockTime>().is_err());
        assert!("07:60".parse::<ClockTime>().is_err());
        assert!("0735".parse::<ClockTime>().is_err());
        assert!("7:5".parse::<ClockTime>().is_err());
        assert!("".parse::<ClockTime>().is_err());
    }

    #[test]
    fn serde_uses_string_form() {
        let time = ClockTime::new(9, 5).unwrap();
        let json = serde_json::to_string(&time).unwrap();
        assert_eq!(json, "\"09:05\"");
        let back: ClockTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, time);
        assert!(serde_json::from_str::<ClockTime>("\"25:00\"").is_err());
    }

    #[test]
    fn naive_time_round_trip() {
        let time = ClockTime::new(13, 40).unwrap();
        assert_eq!(ClockTime::from(time.to_naive_time()), time);
    }
}
