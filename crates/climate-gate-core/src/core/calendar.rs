// climate-gate-core/src/core/calendar.rs
// ============================================================================
// Module: Climate Gate Calendars and Time Axes
// Description: CF calendar arithmetic, time bounds, and time-axis indexing.
// Purpose: Map caller date ranges onto archive time steps exactly.
// Dependencies: serde, crate::core::error
// ============================================================================

//! ## Overview
//! Climate model output uses CF calendars that differ from the civil calendar
//! (`noleap`, `all_leap`, `360_day`). A [`TimeAxis`] pairs a calendar with a
//! sampling [`Frequency`], a first-step date, and a step count, and converts
//! inclusive [`TimeRange`] bounds into inclusive step indices.
//!
//! Bounds given as `YYYY-MM` cover the whole month: as a start they begin on
//! its first day and as an end they run through its last day.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::RequestError;

// ============================================================================
// SECTION: Calendar
// ============================================================================

/// CF calendar identifiers supported by the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Calendar {
    /// Proleptic Gregorian calendar.
    #[default]
    #[serde(rename = "standard", alias = "gregorian", alias = "proleptic_gregorian")]
    Standard,
    /// 365-day calendar without leap years.
    #[serde(rename = "noleap", alias = "365_day")]
    NoLeap,
    /// 366-day calendar where every year is a leap year.
    #[serde(rename = "all_leap", alias = "366_day")]
    AllLeap,
    /// Twelve 30-day months.
    #[serde(rename = "360_day")]
    Day360,
}

/// Month lengths for a common year.
const COMMON_MONTH_DAYS: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

impl Calendar {
    /// Returns true when `year` has a February 29th.
    #[must_use]
    pub const fn is_leap(self, year: i32) -> bool {
        match self {
            Self::Standard => (year % 4 == 0 && year % 100 != 0) || year % 400 == 0,
            Self::NoLeap | Self::Day360 => false,
            Self::AllLeap => true,
        }
    }

    /// Returns the number of days in `month` (1-based) of `year`.
    #[must_use]
    pub fn days_in_month(self, year: i32, month: u8) -> u8 {
        if matches!(self, Self::Day360) {
            return 30;
        }
        let index = usize::from(month.clamp(1, 12) - 1);
        let base = COMMON_MONTH_DAYS.get(index).copied().unwrap_or(31);
        if month == 2 && self.is_leap(year) { base + 1 } else { base }
    }

    /// Days elapsed before January 1st of `year`, counted from year 0.
    fn days_before_year(self, year: i32) -> i64 {
        let year = i64::from(year);
        match self {
            Self::Standard => {
                let prior = year - 1;
                365 * year + prior.div_euclid(4) - prior.div_euclid(100) + prior.div_euclid(400) + 1
            }
            Self::NoLeap => 365 * year,
            Self::AllLeap => 366 * year,
            Self::Day360 => 360 * year,
        }
    }

    /// Days elapsed before the first of `month` within `year`.
    fn days_before_month(self, year: i32, month: u8) -> i64 {
        (1 .. month).map(|m| i64::from(self.days_in_month(year, m))).sum()
    }

    /// Converts a date into a day ordinal, clamping the day to the month length.
    #[must_use]
    pub fn day_ordinal(self, date: CalendarDate) -> i64 {
        let day = date.day.min(self.days_in_month(date.year, date.month)).max(1);
        self.days_before_year(date.year)
            + self.days_before_month(date.year, date.month)
            + i64::from(day - 1)
    }

    /// Converts a day ordinal back into a calendar date.
    #[must_use]
    pub fn date_from_ordinal(self, ordinal: i64) -> CalendarDate {
        let mut year = self.estimate_year(ordinal);
        while self.days_before_year(year) > ordinal {
            year -= 1;
        }
        while self.days_before_year(year + 1) <= ordinal {
            year += 1;
        }
        let mut remaining = ordinal - self.days_before_year(year);
        let mut month = 1_u8;
        while month < 12 {
            let length = i64::from(self.days_in_month(year, month));
            if remaining < length {
                break;
            }
            remaining -= length;
            month += 1;
        }
        let day = u8::try_from(remaining + 1).unwrap_or(1);
        CalendarDate {
            year,
            month,
            day,
        }
    }

    /// Rough year guess for an ordinal, refined by the caller.
    fn estimate_year(self, ordinal: i64) -> i32 {
        let per_year = match self {
            Self::Standard | Self::NoLeap => 365,
            Self::AllLeap => 366,
            Self::Day360 => 360,
        };
        i32::try_from(ordinal.div_euclid(per_year)).unwrap_or(0)
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Standard => "standard",
            Self::NoLeap => "noleap",
            Self::AllLeap => "all_leap",
            Self::Day360 => "360_day",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Calendar Date
// ============================================================================

/// Calendar-agnostic year/month/day triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate {
    /// Year.
    pub year: i32,
    /// Month, 1-based.
    pub month: u8,
    /// Day of month, 1-based.
    pub day: u8,
}

impl CalendarDate {
    /// Builds a date, checking only the month and a 31-day upper bound.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidDate`] for an out-of-range month or day.
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, RequestError> {
        if !(1 ..= 12).contains(&month) || !(1 ..= 31).contains(&day) {
            return Err(RequestError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")));
        }
        Ok(Self {
            year,
            month,
            day,
        })
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = RequestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bound = TimeBound::parse(&value)?;
        let day = bound.day.ok_or(RequestError::InvalidDate(value))?;
        Self::new(bound.year, bound.month, day)
    }
}

impl From<CalendarDate> for String {
    fn from(date: CalendarDate) -> Self {
        date.to_string()
    }
}

// ============================================================================
// SECTION: Time Bound
// ============================================================================

/// Date bound with month or day precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeBound {
    /// Year.
    pub year: i32,
    /// Month, 1-based.
    pub month: u8,
    /// Day of month; `None` means the whole month.
    pub day: Option<u8>,
}

impl TimeBound {
    /// Parses `YYYY-MM` or `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidDate`] when the text does not match
    /// either form or a component is out of range.
    pub fn parse(text: &str) -> Result<Self, RequestError> {
        let invalid = || RequestError::InvalidDate(text.to_string());
        let parts: Vec<&str> = text.trim().split('-').collect();
        if !(2 ..= 3).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        if parts.iter().any(|p| !p.bytes().all(|b| b.is_ascii_digit())) {
            return Err(invalid());
        }
        let year = parts[0].parse::<i32>().map_err(|_| invalid())?;
        let month = parts[1].parse::<u8>().map_err(|_| invalid())?;
        if !(1 ..= 12).contains(&month) {
            return Err(invalid());
        }
        let day = match parts.get(2) {
            Some(text) => {
                let day = text.parse::<u8>().map_err(|_| invalid())?;
                if !(1 ..= 31).contains(&day) {
                    return Err(invalid());
                }
                Some(day)
            }
            None => None,
        };
        Ok(Self {
            year,
            month,
            day,
        })
    }

    /// Month-precision bound.
    #[must_use]
    pub const fn month(year: i32, month: u8) -> Self {
        Self {
            year,
            month,
            day: None,
        }
    }

    /// Day-precision bound.
    #[must_use]
    pub const fn day(date: CalendarDate) -> Self {
        Self {
            year: date.year,
            month: date.month,
            day: Some(date.day),
        }
    }

    /// First calendar day covered by the bound.
    #[must_use]
    pub fn first_day(&self) -> CalendarDate {
        CalendarDate {
            year: self.year,
            month: self.month,
            day: self.day.unwrap_or(1),
        }
    }

    /// Last calendar day covered by the bound in `calendar`.
    #[must_use]
    pub fn last_day(&self, calendar: Calendar) -> CalendarDate {
        let last = calendar.days_in_month(self.year, self.month);
        CalendarDate {
            year: self.year,
            month: self.month,
            day: self.day.map_or(last, |day| day.min(last)),
        }
    }

    /// Month ordinal (`year * 12 + month - 1`).
    fn month_ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.day {
            Some(day) => write!(f, "{:04}-{:02}-{day:02}", self.year, self.month),
            None => write!(f, "{:04}-{:02}", self.year, self.month),
        }
    }
}

impl TryFrom<String> for TimeBound {
    type Error = RequestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeBound> for String {
    fn from(bound: TimeBound) -> Self {
        bound.to_string()
    }
}

// ============================================================================
// SECTION: Time Range
// ============================================================================

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeRangeWire")]
pub struct TimeRange {
    /// Inclusive start bound.
    start: TimeBound,
    /// Inclusive end bound.
    end: TimeBound,
}

/// Unvalidated wire form of [`TimeRange`].
#[derive(Deserialize)]
struct TimeRangeWire {
    /// Inclusive start bound.
    start: TimeBound,
    /// Inclusive end bound.
    end: TimeBound,
}

impl TryFrom<TimeRangeWire> for TimeRange {
    type Error = RequestError;

    fn try_from(wire: TimeRangeWire) -> Result<Self, Self::Error> {
        Self::new(wire.start, wire.end)
    }
}

impl TimeRange {
    /// Builds a range, rejecting a start that falls after the end.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::TimeOrder`] when `start` is after `end`.
    pub fn new(start: TimeBound, end: TimeBound) -> Result<Self, RequestError> {
        let end_key = (end.year, end.month, end.day.unwrap_or(31));
        let start_key = (start.year, start.month, start.day.unwrap_or(1));
        if start_key.cmp(&end_key) == Ordering::Greater {
            return Err(RequestError::TimeOrder {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            start,
            end,
        })
    }

    /// Parses a range from two bound strings.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when either bound is malformed or the range is inverted.
    pub fn parse(start: &str, end: &str) -> Result<Self, RequestError> {
        Self::new(TimeBound::parse(start)?, TimeBound::parse(end)?)
    }

    /// Inclusive start bound.
    #[must_use]
    pub const fn start(&self) -> TimeBound {
        self.start
    }

    /// Inclusive end bound.
    #[must_use]
    pub const fn end(&self) -> TimeBound {
        self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ============================================================================
// SECTION: Frequency
// ============================================================================

/// Sampling frequency of a time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// One step per calendar month.
    Monthly,
    /// One step per day.
    Daily,
    /// Fixed number of hours per step; must divide 24.
    SubDaily(u8),
}

impl Frequency {
    /// Maps a CMIP table identifier (`Amon`, `day`, `6hr`, ...) to a frequency.
    #[must_use]
    pub fn from_table_id(table: &str) -> Option<Self> {
        match table {
            "Amon" | "Omon" | "Lmon" | "LImon" | "SImon" | "Emon" | "mon" => Some(Self::Monthly),
            "day" | "Eday" | "Oday" | "SIday" | "CFday" => Some(Self::Daily),
            "6hr" | "6hrLev" | "6hrPlev" | "6hrPlevPt" => Some(Self::SubDaily(6)),
            "3hr" | "E3hr" | "CF3hr" => Some(Self::SubDaily(3)),
            "1hr" | "E1hr" => Some(Self::SubDaily(1)),
            _ => None,
        }
    }

    /// Steps per bound unit: one per month or day, `24 / hours` for sub-daily axes.
    #[must_use]
    pub fn steps_per_unit(self) -> usize {
        match self {
            Self::Monthly | Self::Daily => 1,
            Self::SubDaily(hours) => 24 / usize::from(hours.max(1)),
        }
    }

    /// Returns true when the frequency is well-formed.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        match self {
            Self::Monthly | Self::Daily => true,
            Self::SubDaily(hours) => hours > 0 && 24 % hours == 0,
        }
    }
}

// ============================================================================
// SECTION: Time Axis
// ============================================================================

/// Calendar-aware description of a dataset's time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAxis {
    /// CF calendar.
    pub calendar: Calendar,
    /// Sampling frequency.
    pub frequency: Frequency,
    /// Date of the first step; sub-daily axes start at 00:00.
    pub start: CalendarDate,
    /// Number of steps.
    pub size: usize,
}

impl TimeAxis {
    /// Ordinal of the first step in bound units (months or days).
    fn first_unit(&self) -> i64 {
        match self.frequency {
            Frequency::Monthly => TimeBound::day(self.start).month_ordinal(),
            Frequency::Daily | Frequency::SubDaily(_) => self.calendar.day_ordinal(self.start),
        }
    }

    /// Number of bound units spanned by the axis, counting a partial final unit.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.size.div_ceil(self.frequency.steps_per_unit())
    }

    /// Unit ordinal of a range start bound.
    fn start_unit(&self, bound: &TimeBound) -> i64 {
        match self.frequency {
            Frequency::Monthly => bound.month_ordinal(),
            Frequency::Daily | Frequency::SubDaily(_) => self.calendar.day_ordinal(bound.first_day()),
        }
    }

    /// Unit ordinal of a range end bound.
    fn end_unit(&self, bound: &TimeBound) -> i64 {
        match self.frequency {
            Frequency::Monthly => bound.month_ordinal(),
            Frequency::Daily | Frequency::SubDaily(_) => {
                self.calendar.day_ordinal(bound.last_day(self.calendar))
            }
        }
    }

    /// Inclusive step indices covered by `range`, clipped to the axis.
    ///
    /// Returns `None` when the range does not overlap the axis.
    #[must_use]
    pub fn step_range(&self, range: &TimeRange) -> Option<(usize, usize)> {
        if self.size == 0 {
            return None;
        }
        let per_unit = i64::try_from(self.frequency.steps_per_unit()).ok()?;
        let first = self.first_unit();
        let last_step = i64::try_from(self.size - 1).ok()?;
        let lo = (self.start_unit(&range.start) - first) * per_unit;
        let hi = (self.end_unit(&range.end) - first + 1) * per_unit - 1;
        let lo = lo.max(0);
        let hi = hi.min(last_step);
        if lo > hi {
            return None;
        }
        Some((usize::try_from(lo).ok()?, usize::try_from(hi).ok()?))
    }

    /// Returns true when both bounds of `range` lie within the axis extent.
    #[must_use]
    pub fn covers(&self, range: &TimeRange) -> bool {
        let first = self.first_unit();
        let Ok(units) = i64::try_from(self.unit_count()) else {
            return false;
        };
        let last = first + units - 1;
        let start = self.start_unit(&range.start);
        let end = self.end_unit(&range.end);
        start >= first && end <= last
    }

    /// Bound naming the unit that contains `step`.
    #[must_use]
    pub fn bound_at(&self, step: usize) -> TimeBound {
        let unit = i64::try_from(step / self.frequency.steps_per_unit()).unwrap_or(0);
        let ordinal = self.first_unit() + unit;
        match self.frequency {
            Frequency::Monthly => {
                let year = i32::try_from(ordinal.div_euclid(12)).unwrap_or(0);
                let month = u8::try_from(ordinal.rem_euclid(12) + 1).unwrap_or(1);
                TimeBound::month(year, month)
            }
            Frequency::Daily | Frequency::SubDaily(_) => {
                TimeBound::day(self.calendar.date_from_ordinal(ordinal))
            }
        }
    }

    /// Human-readable label for a single step.
    #[must_use]
    pub fn label_at(&self, step: usize) -> String {
        let bound = self.bound_at(step);
        match self.frequency {
            Frequency::Monthly | Frequency::Daily => bound.to_string(),
            Frequency::SubDaily(hours) => {
                let within = step % self.frequency.steps_per_unit();
                format!("{bound}T{:02}:00", within * usize::from(hours))
            }
        }
    }

    /// Range naming the bound units that contain steps `first ..= last`.
    ///
    /// Returns `None` for an empty axis.
    #[must_use]
    pub fn range_between(&self, first: usize, last: usize) -> Option<TimeRange> {
        if self.size == 0 {
            return None;
        }
        let last = last.min(self.size - 1);
        TimeRange::new(self.bound_at(first.min(last)), self.bound_at(last)).ok()
    }

    /// Full extent of the axis.
    #[must_use]
    pub fn extent(&self) -> Option<TimeRange> {
        self.range_between(0, self.size.saturating_sub(1))
    }
}
