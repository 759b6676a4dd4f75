use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DispatchError;

const TIME_FORMAT: &str = "%H:%M";

/// Wall-clock interval without a date component, written as `HH:MM-HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }

    /// True when either endpoint of `self` lies inside `other`, bounds included.
    ///
    /// This is an endpoint test, not interval intersection: a `self` that
    /// strictly brackets `other` does not overlap it, while the reverse
    /// call does.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        other.contains(self.start) || other.contains(self.end)
    }
}

/// True when any window of `windows` overlaps any window of `against`.
pub fn any_overlap(windows: &[TimeWindow], against: &[TimeWindow]) -> bool {
    windows
        .iter()
        .any(|window| against.iter().any(|other| window.overlaps(other)))
}

impl FromStr for TimeWindow {
    type Err = DispatchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (start, end) = raw
            .split_once('-')
            .ok_or_else(|| DispatchError::InvalidTimeWindow(format!("{raw:?} has no '-'")))?;

        let parse = |part: &str| {
            NaiveTime::parse_from_str(part.trim(), TIME_FORMAT)
                .map_err(|err| DispatchError::InvalidTimeWindow(format!("{raw:?}: {err}")))
        };

        Ok(Self::new(parse(start)?, parse(end)?))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

impl Serialize for TimeWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub fn parse_windows<S: AsRef<str>>(raw: &[S]) -> Result<Vec<TimeWindow>, DispatchError> {
    raw.iter().map(|item| item.as_ref().parse()).collect()
}
