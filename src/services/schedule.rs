//! Schedule Evaluator.
//!
//! Pure decisions about whether a daily/weekly/monthly summary is due at a
//! given instant in the configured zone. Evaluation has minute granularity:
//! the caller must run at least once per minute, and a missed minute is not
//! made up later in the period.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Weekday};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;

use crate::models::NotificationSettings;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]?\d|2[0-3]):([0-5]\d)$").expect("valid time regex"));

/// Two weekly sends must be separated by more than this many days.
const WEEKLY_MIN_GAP_DAYS: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid time of day '{0}'")]
pub struct InvalidTimeOfDay(pub String);

impl FromStr for TimeOfDay {
    type Err = InvalidTimeOfDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TIME_RE
            .captures(s.trim())
            .ok_or_else(|| InvalidTimeOfDay(s.to_string()))?;
        let hour = caps[1].parse().map_err(|_| InvalidTimeOfDay(s.to_string()))?;
        let minute = caps[2].parse().map_err(|_| InvalidTimeOfDay(s.to_string()))?;
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TimeOfDay {
    fn matches(&self, now: &DateTime<Tz>) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleKind {
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleKind {
    pub const ALL: [ScheduleKind; 3] = [ScheduleKind::Daily, ScheduleKind::Weekly, ScheduleKind::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Document path of this schedule's checkpoint.
    pub fn checkpoint_field(&self) -> &'static str {
        match self {
            Self::Daily => "daily_summary.last_sent_at",
            Self::Weekly => "weekly_summary.last_sent_at",
            Self::Monthly => "monthly_summary.last_sent_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Daily { at: TimeOfDay },
    Weekly { weekday: Weekday, at: TimeOfDay },
    // no clamping: a day past the end of the month never fires that month
    Monthly { day: u32, at: TimeOfDay },
}

/// 0 = Sunday .. 6 = Saturday.
pub fn weekday_from_index(idx: u32) -> Option<Weekday> {
    match idx {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// An enabled schedule of `kind` with its checkpoint, or `None` when disabled.
pub fn configured_trigger(
    settings: &NotificationSettings,
    kind: ScheduleKind,
) -> Option<Result<(Trigger, Option<i64>), InvalidTimeOfDay>> {
    let build = || -> Result<(Trigger, Option<i64>), InvalidTimeOfDay> {
        match kind {
            ScheduleKind::Daily => {
                let s = &settings.daily_summary;
                Ok((Trigger::Daily { at: s.time.parse()? }, s.last_sent_at))
            }
            ScheduleKind::Weekly => {
                let s = &settings.weekly_summary;
                let weekday = weekday_from_index(s.day_of_week)
                    .ok_or_else(|| InvalidTimeOfDay(format!("day_of_week {}", s.day_of_week)))?;
                Ok((
                    Trigger::Weekly {
                        weekday,
                        at: s.time.parse()?,
                    },
                    s.last_sent_at,
                ))
            }
            ScheduleKind::Monthly => {
                let s = &settings.monthly_summary;
                Ok((
                    Trigger::Monthly {
                        day: s.day_of_month,
                        at: s.time.parse()?,
                    },
                    s.last_sent_at,
                ))
            }
        }
    };

    let enabled = match kind {
        ScheduleKind::Daily => settings.daily_summary.enabled,
        ScheduleKind::Weekly => settings.weekly_summary.enabled,
        ScheduleKind::Monthly => settings.monthly_summary.enabled,
    };

    enabled.then(build)
}

/// Decides whether `trigger` fires at `now` given the last send.
pub fn is_due(trigger: &Trigger, last_sent_at: Option<DateTime<Tz>>, now: DateTime<Tz>) -> bool {
    match trigger {
        Trigger::Daily { at } => {
            at.matches(&now)
                && last_sent_at.is_none_or(|last| last.with_timezone(&now.timezone()).date_naive() != now.date_naive())
        }
        Trigger::Weekly { weekday, at } => {
            now.weekday() == *weekday
                && at.matches(&now)
                && last_sent_at.is_none_or(|last| now.signed_duration_since(last) > Duration::days(WEEKLY_MIN_GAP_DAYS))
        }
        Trigger::Monthly { day, at } => {
            now.day() == *day
                && at.matches(&now)
                && last_sent_at.is_none_or(|last| {
                    let last = last.with_timezone(&now.timezone());
                    (last.year(), last.month()) != (now.year(), now.month())
                })
        }
    }
}

/// Converts a stored unix-seconds checkpoint into the evaluation zone.
pub fn checkpoint_in_zone(ts: Option<i64>, tz: Tz) -> Option<DateTime<Tz>> {
    ts.and_then(|secs| tz.timestamp_opt(secs, 0).single())
}
