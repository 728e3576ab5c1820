use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Month + year reporting key, rendered as MMYYYY on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    month: u8,
    year: u16,
}

impl Period {
    /// Clamps the month into 1..=12
    pub fn from_parts(month: i64, year: i64) -> Self {
        Self {
            month: month.clamp(1, 12) as u8,
            year: year.clamp(0, 9999) as u16,
        }
    }

    pub fn parse(period: &str) -> Result<Self, String> {
        let p = period.trim();
        if p.len() != 6 || !p.bytes().all(|b| b.is_ascii_digit()) {
            return Err("Invalid period format. Expected MMYYYY".to_string());
        }
        let month: u8 = p[..2]
            .parse()
            .map_err(|_| "Invalid period month".to_string())?;
        let year: u16 = p[2..]
            .parse()
            .map_err(|_| "Invalid period year".to_string())?;
        if !(1..=12).contains(&month) {
            return Err(format!("Invalid period month {:02}", month));
        }
        Ok(Self { month, year })
    }

    pub fn current() -> Self {
        let today = chrono::Local::now().date_naive();
        Self::from_parts(today.month() as i64, today.year() as i64)
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> u16 {
        self.year
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:04}", self.month, self.year)
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
