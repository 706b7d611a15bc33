use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure to recover a calendar instant from a raw date field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("malformed timestamp '{raw}': found {found} numeric components, expected 6")]
    TooFewComponents { raw: String, found: usize },

    #[error("malformed timestamp '{raw}': {component} '{value}' is not a number")]
    NonNumeric {
        raw: String,
        component: Component,
        value: String,
    },

    #[error("malformed timestamp '{raw}': {component} {value} is out of range")]
    OutOfRange {
        raw: String,
        component: Component,
        value: u32,
    },
}

/// One calendar component of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Day,
    Month,
    Year,
    Hour,
    Minute,
    Second,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::Day,
        Component::Month,
        Component::Year,
        Component::Hour,
        Component::Minute,
        Component::Second,
    ];
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Day => "day",
            Component::Month => "month",
            Component::Year => "year",
            Component::Hour => "hour",
            Component::Minute => "minute",
            Component::Second => "second",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field order must name each of day, month, year, hour, minute, second exactly once")]
pub struct InvalidFieldOrder;

/// Positional layout of the numeric fields recovered from a raw timestamp.
///
/// The default assumes `day month year hour minute second`. The order-repair
/// heuristic always works on the day/month/year slots, wherever they sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Component>", into = "Vec<Component>")]
pub struct FieldOrder {
    slots: [Component; 6],
}

impl FieldOrder {
    pub fn new(slots: [Component; 6]) -> Result<Self, InvalidFieldOrder> {
        for component in Component::ALL {
            if slots.iter().filter(|&&c| c == component).count() != 1 {
                return Err(InvalidFieldOrder);
            }
        }
        Ok(Self { slots })
    }

    /// Index of `component` among the six recovered fields
    pub fn position(&self, component: Component) -> usize {
        self.slots
            .iter()
            .position(|&c| c == component)
            .unwrap_or_default()
    }

    pub fn slots(&self) -> &[Component; 6] {
        &self.slots
    }
}

impl Default for FieldOrder {
    fn default() -> Self {
        Self {
            slots: Component::ALL,
        }
    }
}

impl TryFrom<Vec<Component>> for FieldOrder {
    type Error = InvalidFieldOrder;

    fn try_from(value: Vec<Component>) -> Result<Self, Self::Error> {
        let slots: [Component; 6] = value.try_into().map_err(|_| InvalidFieldOrder)?;
        Self::new(slots)
    }
}

impl From<FieldOrder> for Vec<Component> {
    fn from(order: FieldOrder) -> Self {
        order.slots.to_vec()
    }
}

/// A resolved calendar instant with no timezone.
///
/// The day is checked against 1..=31 only, not against the length of the month.
/// Field order gives the derived `Ord` its coarsest-first ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalTimestamp {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CanonicalTimestamp {
    /// Build a timestamp, returning the first component outside its valid range.
    pub fn new(
        year: u32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<Self, (Component, u32)> {
        let checks = [
            (Component::Year, year, (2000..=9999).contains(&year)),
            (Component::Month, month, (1..=12).contains(&month)),
            (Component::Day, day, (1..=31).contains(&day)),
            (Component::Hour, hour, hour < 24),
            (Component::Minute, minute, minute < 60),
            (Component::Second, second, second < 60),
        ];
        if let Some((component, value, _)) = checks.into_iter().find(|(_, _, ok)| !ok) {
            return Err((component, value));
        }

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    pub fn component(&self, component: Component) -> u32 {
        match component {
            Component::Year => self.year,
            Component::Month => self.month,
            Component::Day => self.day,
            Component::Hour => self.hour,
            Component::Minute => self.minute,
            Component::Second => self.second,
        }
    }

    /// The equivalent chrono value, or None when the day does not exist in that month.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, self.second)
    }
}

impl fmt::Display for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Outcome of a successful normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalized {
    /// Day and month order was forced by the input.
    Resolved(CanonicalTimestamp),
    /// Day and month could each have been the other; the positional reading was kept.
    Ambiguous(CanonicalTimestamp),
}

impl Normalized {
    pub fn timestamp(&self) -> CanonicalTimestamp {
        match self {
            Normalized::Resolved(ts) | Normalized::Ambiguous(ts) => *ts,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Normalized::Ambiguous(_))
    }
}

/// Repairs free-form timestamp text into a [`CanonicalTimestamp`].
#[derive(Debug, Clone)]
pub struct TimestampNormalizer {
    junk: Regex,
    separator: Regex,
    order: FieldOrder,
}

impl TimestampNormalizer {
    pub fn new(order: FieldOrder) -> Self {
        Self {
            junk: Regex::new(r"[^0-9./: -]").expect("static regex"),
            separator: Regex::new(r"[^0-9]").expect("static regex"),
            order,
        }
    }

    pub fn order(&self) -> FieldOrder {
        self.order
    }

    /// Normalize one raw timestamp.
    ///
    /// Characters outside digits and `./: -` are dropped, every remaining
    /// separator splits a field, and the first six fields are kept. Empty
    /// fields become `01`. A four-digit day is taken to be the year, a
    /// two-digit year gains the `20` century, and a month above 12 trades
    /// places with the day.
    pub fn normalize(&self, raw: &str) -> Result<Normalized, TimestampError> {
        let cleaned = self.junk.replace_all(raw.trim(), "");
        let mut fields: Vec<String> = self
            .separator
            .split(&cleaned)
            .take(6)
            .map(|field| {
                if field.is_empty() {
                    "01".to_string()
                } else {
                    field.to_string()
                }
            })
            .collect();

        if fields.len() < 6 {
            return Err(TimestampError::TooFewComponents {
                raw: raw.to_string(),
                found: fields.len(),
            });
        }

        let day = self.order.position(Component::Day);
        let month = self.order.position(Component::Month);
        let year = self.order.position(Component::Year);

        if fields[day].len() == 4 {
            fields.swap(day, year);
        }
        if fields[year].len() == 2 {
            fields[year] = format!("20{}", fields[year]);
        }

        let month_overflow = parse_field(raw, Component::Month, &fields[month])? > 12;
        if month_overflow {
            fields.swap(day, month);
        }

        let mut values = [0u32; 6];
        for (slot, component) in self.order.slots().iter().enumerate() {
            values[slot] = parse_field(raw, *component, &fields[slot])?;
        }
        let value_of = |component| values[self.order.position(component)];

        let ts = CanonicalTimestamp::new(
            value_of(Component::Year),
            value_of(Component::Month),
            value_of(Component::Day),
            value_of(Component::Hour),
            value_of(Component::Minute),
            value_of(Component::Second),
        )
        .map_err(|(component, value)| TimestampError::OutOfRange {
            raw: raw.to_string(),
            component,
            value,
        })?;

        // Moving a leading year into place says nothing about day versus month.
        let interchangeable = ts.day <= 12 && ts.month <= 12 && ts.day != ts.month;
        if interchangeable && !month_overflow {
            Ok(Normalized::Ambiguous(ts))
        } else {
            Ok(Normalized::Resolved(ts))
        }
    }
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        Self::new(FieldOrder::default())
    }
}

fn parse_field(raw: &str, component: Component, value: &str) -> Result<u32, TimestampError> {
    value.parse().map_err(|_| TimestampError::NonNumeric {
        raw: raw.to_string(),
        component,
        value: value.to_string(),
    })
}
