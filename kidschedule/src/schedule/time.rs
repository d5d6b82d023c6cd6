//! Weekday and time-of-day values
//!
//! Times are always rendered zero-padded 24-hour `HH:MM`, so the string form
//! sorts the same way the value does.

use crate::error::AppError;
use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A day in the household week. There is no Saturday; the week starts on Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 6] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
    ];

    /// Map a calendar weekday onto the household week.
    /// Saturday has no classes of its own and shows Sunday's bag.
    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun | Weekday::Sat => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
        }
    }

    /// The household day for the local current date
    pub fn today() -> Self {
        Self::from_weekday(chrono::Local::now().weekday())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DayOfWeek::ALL
            .into_iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Unknown day of week: {}", s)))
    }
}

/// Wall-clock time of day with minute precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, AppError> {
        if hour > 23 || minute > 59 {
            return Err(AppError::InvalidTime(format!("{}:{:02}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl FromStr for TimeOfDay {
    type Err = AppError;

    /// Accepts `H:MM` and `HH:MM`; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidTime(s.to_string());

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;

        let hour_ok = (1..=2).contains(&hour.len()) && hour.bytes().all(|b| b.is_ascii_digit());
        let minute_ok = minute.len() == 2 && minute.bytes().all(|b| b.is_ascii_digit());
        if !hour_ok || !minute_ok {
            return Err(invalid());
        }

        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;

        TimeOfDay::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_zero_padded() {
        let t: TimeOfDay = "8:05".parse().unwrap();
        assert_eq!(t.to_string(), "08:05");

        let t: TimeOfDay = "17:30".parse().unwrap();
        assert_eq!(t.hour(), 17);
        assert_eq!(t.minute(), 30);
    }

    #[test]
    fn test_rejects_malformed_times() {
        for bad in ["", "8", "24:00", "12:60", "12:5", "ab:cd", "123:00", "12:00:00"] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_ordering_matches_string_ordering() {
        let times = ["00:00", "07:59", "08:00", "09:30", "12:00", "23:59"];
        for a in times {
            for b in times {
                let ta: TimeOfDay = a.parse().unwrap();
                let tb: TimeOfDay = b.parse().unwrap();
                assert_eq!(ta.cmp(&tb), a.cmp(b));
            }
        }
    }

    #[test]
    fn test_serde_uses_string_form() {
        let t: TimeOfDay = serde_json::from_str("\"9:00\"").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"09:00\"");
        assert!(serde_json::from_str::<TimeOfDay>("\"25:00\"").is_err());
    }

    #[test]
    fn test_saturday_maps_to_sunday() {
        assert_eq!(DayOfWeek::from_weekday(Weekday::Sat), DayOfWeek::Sunday);
        assert_eq!(DayOfWeek::from_weekday(Weekday::Sun), DayOfWeek::Sunday);
        assert_eq!(DayOfWeek::from_weekday(Weekday::Wed), DayOfWeek::Wednesday);
    }

    #[test]
    fn test_day_names() {
        assert_eq!(serde_json::to_string(&DayOfWeek::Monday).unwrap(), "\"Monday\"");
        assert_eq!("friday".parse::<DayOfWeek>().unwrap(), DayOfWeek::Friday);
        assert!("Saturday".parse::<DayOfWeek>().is_err());
    }
}
