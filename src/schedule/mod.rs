//! Wall-clock ↔ UTC conversion for post scheduling.
//!
//! Converts a `YYYY-MM-DDTHH:MM` wall-clock string interpreted in a named
//! IANA zone into the UTC instant a publisher consumes, and back. The
//! conversion never constructs an instant from zone-local fields
//! directly: it forms a guess instant from the fields as if they were
//! UTC, derives the zone's offset by formatting that guess back into the
//! zone, and corrects by the difference. Exact for all whole-minute
//! offsets, including half-hour and 45-minute zones.
//!
//! A wall time inside a spring-forward gap has no real instant; the
//! offset computed at the guess is kept and the result logged as a
//! best-effort approximation, never an error.

#[cfg(test)]
mod tests;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::{AppError, Result};

/// Civil date-time fields with no zone attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl WallClock {
    /// Parses the dashboard's `YYYY-MM-DDTHH:MM` input format.
    pub fn parse(input: &str) -> Result<Self> {
        let re = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2})$").unwrap();
        let caps = re.captures(input).ok_or_else(|| {
            AppError::Validation(format!("wall-clock input not YYYY-MM-DDTHH:MM: {}", input))
        })?;

        let wall = Self {
            year: caps[1].parse().unwrap(),
            month: caps[2].parse().unwrap(),
            day: caps[3].parse().unwrap(),
            hour: caps[4].parse().unwrap(),
            minute: caps[5].parse().unwrap(),
        };
        if wall.hour > 23 || wall.minute > 59 {
            return Err(AppError::Validation(format!(
                "wall-clock time out of range: {}",
                input
            )));
        }
        // Surfaces impossible calendar dates (Feb 30) at parse time.
        wall.as_utc_guess()?;
        Ok(wall)
    }

    /// The fields read as if they were already UTC. Hour 24 (midnight
    /// rollover candidates) spills into the next day arithmetically.
    fn as_utc_guess(&self) -> Result<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or_else(|| {
            AppError::Validation(format!("invalid calendar date: {}", self))
        })?;
        let midnight = date.and_hms_opt(0, 0, 0).unwrap();
        let naive = midnight
            + Duration::hours(self.hour as i64)
            + Duration::minutes(self.minute as i64);
        Ok(Utc.from_utc_datetime(&naive))
    }
}

impl std::fmt::Display for WallClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

fn zone_of(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| AppError::Zone(name.to_string()))
}

/// The zone-local civil fields of `instant` — the only place the tz
/// database is consulted. The conversions below use nothing else.
fn zone_local_fields(instant: DateTime<Utc>, zone: &str) -> Result<WallClock> {
    let local = instant.with_timezone(&zone_of(zone)?);
    Ok(WallClock {
        year: local.year(),
        month: local.month(),
        day: local.day(),
        hour: local.hour(),
        minute: local.minute(),
    })
}

/// Converts a wall-clock string interpreted in `zone` to its UTC instant.
pub fn local_input_to_utc(input: &str, zone: &str) -> Result<DateTime<Utc>> {
    local_fields_to_utc(&WallClock::parse(input)?, zone)
}

fn local_fields_to_utc(wall: &WallClock, zone: &str) -> Result<DateTime<Utc>> {
    let guess = wall.as_utc_guess()?;
    // Offset at the guess instant, derived purely by formatting: the
    // zone-local fields read back as UTC differ from the guess by exactly
    // the zone's current offset.
    let offset = zone_local_fields(guess, zone)?.as_utc_guess()? - guess;
    let corrected = guess - offset;

    // A spring-forward gap can't round-trip; keep the guess-derived
    // offset and proceed (known approximation, no DST-boundary
    // iteration). Compared as epochs so hour-24 candidates and their
    // normalized form count as the same civil time.
    if zone_local_fields(corrected, zone)?.as_utc_guess()? != guess {
        log::warn!(
            "wall time {} does not exist in {}; scheduling best-effort at {}",
            wall,
            zone,
            corrected
        );
    }
    Ok(corrected)
}

/// Formats a UTC instant as the zone-local `YYYY-MM-DDTHH:MM` input
/// string — the inverse of [`local_input_to_utc`] outside DST edges.
pub fn utc_to_local_input(instant: DateTime<Utc>, zone: &str) -> Result<String> {
    Ok(zone_local_fields(instant, zone)?.to_string())
}

/// The next top-of-hour wall time in `zone`, as an input string. A day
/// rollover (hour 24) is normalized by converting the candidate through
/// [`local_input_to_utc`] and re-formatting, so the result is always a
/// valid wall time even across midnight and month boundaries.
pub fn next_top_of_hour_local(now: DateTime<Utc>, zone: &str) -> Result<String> {
    let mut local = zone_local_fields(now, zone)?;
    if local.minute > 0 {
        local.hour += 1;
        local.minute = 0;
    }
    let normalized = local_fields_to_utc(&local, zone)?;
    utc_to_local_input(normalized, zone)
}

/// `now + minutes`, ceiled to the next whole minute (never floored), as a
/// zone-local input string. Used for the "in 15 minutes" quick-schedule
/// presets.
pub fn plus_minutes_rounded_up(now: DateTime<Utc>, minutes: i64, zone: &str) -> Result<String> {
    let mut t = now + Duration::minutes(minutes);
    let subminute_ms = t.second() as i64 * 1000 + t.timestamp_subsec_millis() as i64;
    if subminute_ms > 0 {
        t = t + Duration::milliseconds(60_000 - subminute_ms);
    }
    utc_to_local_input(t, zone)
}
