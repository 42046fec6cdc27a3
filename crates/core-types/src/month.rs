//! Month identifiers and academic-year ordering.
//!
//! The Korean school year runs from March to February, so January and February
//! sort after December: March is 3, December is 12, January is 13 and
//! February is 14.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::DomainError;

/// Academic-year value of a raw month number. Months 1 and 2 move past 12.
pub fn academic_value(month: u32) -> u32 {
    if month == 1 || month == 2 {
        month + 12
    } else {
        month
    }
}

/// Keep only ASCII digits, e.g. `"9월"` becomes `"9"`.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A calendar month, ordered by academic year.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Month(u8);

impl Month {
    pub fn new(number: u8) -> Option<Self> {
        (1..=12).contains(&number).then_some(Self(number))
    }

    /// Parse any month spelling containing digits (`"9"`, `"9월"`, `" 10 "`).
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let digits = digits_only(raw);
        digits
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| DomainError::InvalidMonth(raw.to_string()))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn academic_value(self) -> u32 {
        academic_value(self.0 as u32)
    }
}

impl Ord for Month {
    fn cmp(&self, other: &Self) -> Ordering {
        self.academic_value().cmp(&other.academic_value())
    }
}

impl PartialOrd for Month {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sort months in academic-year order (March first, February last).
pub fn sort_academic(months: &mut [Month]) {
    months.sort();
}

/// A month as the user typed it. JSON payloads carry either numbers or
/// strings (`3`, `"3"`, `"3월"`); the raw text is preserved for logging and
/// for the wire, and interpreted lazily.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct MonthValue(String);

impl MonthValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Digits of the raw value, empty when there are none.
    pub fn digits(&self) -> String {
        digits_only(&self.0)
    }

    pub fn month(&self) -> Option<Month> {
        Month::parse(&self.0).ok()
    }

    /// Number used for sorting; values without digits count as 0.
    pub fn sort_number(&self) -> u32 {
        self.digits().parse::<u32>().unwrap_or(0)
    }
}

impl From<&str> for MonthValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u8> for MonthValue {
    fn from(value: u8) -> Self {
        Self::new(value.to_string())
    }
}

impl From<Month> for MonthValue {
    fn from(value: Month) -> Self {
        Self::new(value.to_string())
    }
}

impl fmt::Display for MonthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for MonthValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MonthValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MonthVisitor;

        impl<'de> Visitor<'de> for MonthVisitor {
            type Value = MonthValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a month as string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(MonthValue::new(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(MonthValue::new(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(MonthValue::new(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(MonthValue::new((v.trunc() as i64).to_string()))
            }
        }

        deserializer.deserialize_any(MonthVisitor)
    }
}
