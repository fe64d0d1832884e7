use super::*;
use crate::error::AppError;

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

// =========================================================================
// local_input_to_utc
// =========================================================================

#[test]
fn test_est_winter_offset() {
    let instant = local_input_to_utc("2024-01-15T09:00", "America/New_York").unwrap();
    assert_eq!(instant, utc(2024, 1, 15, 14, 0));
}

#[test]
fn test_edt_summer_offset() {
    let instant = local_input_to_utc("2024-07-15T09:00", "America/New_York").unwrap();
    assert_eq!(instant, utc(2024, 7, 15, 13, 0));
}

#[test]
fn test_half_hour_zone() {
    // India is UTC+5:30 year-round.
    let instant = local_input_to_utc("2024-01-15T09:00", "Asia/Kolkata").unwrap();
    assert_eq!(instant, utc(2024, 1, 15, 3, 30));
}

#[test]
fn test_forty_five_minute_zone() {
    // Nepal is UTC+5:45.
    let instant = local_input_to_utc("2024-01-15T09:00", "Asia/Kathmandu").unwrap();
    assert_eq!(instant, utc(2024, 1, 15, 3, 15));
}

#[test]
fn test_utc_is_identity() {
    let instant = local_input_to_utc("2024-06-01T23:45", "UTC").unwrap();
    assert_eq!(instant, utc(2024, 6, 1, 23, 45));
}

#[test]
fn test_dst_gap_is_best_effort_not_an_error() {
    // 02:30 on 2024-03-10 does not exist in New York (clocks jump from
    // 02:00 EST to 03:00 EDT). The guess-derived offset is EST (-5), so
    // the converter lands on 07:30Z and does not reject.
    let instant = local_input_to_utc("2024-03-10T02:30", "America/New_York").unwrap();
    assert_eq!(instant, utc(2024, 3, 10, 7, 30));
}

#[test]
fn test_fall_back_ambiguous_time_resolves() {
    // 01:30 on 2024-11-03 occurs twice in New York; the guess instant is
    // still in EDT, so the first occurrence wins.
    let instant = local_input_to_utc("2024-11-03T01:30", "America/New_York").unwrap();
    assert_eq!(instant, utc(2024, 11, 3, 5, 30));
}

#[test]
fn test_round_trip_through_formatting() {
    let instant = local_input_to_utc("2024-05-20T18:05", "Europe/Berlin").unwrap();
    let formatted = utc_to_local_input(instant, "Europe/Berlin").unwrap();
    assert_eq!(formatted, "2024-05-20T18:05");
}

#[test]
fn test_malformed_input_rejected() {
    for input in ["2024-01-15 09:00", "2024-1-15T09:00", "not a time", "2024-01-15T24:00"] {
        let err = local_input_to_utc(input, "UTC").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "input: {}", input);
    }
}

#[test]
fn test_impossible_calendar_date_rejected() {
    let err = local_input_to_utc("2024-02-30T09:00", "UTC").unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn test_unknown_zone_rejected() {
    let err = local_input_to_utc("2024-01-15T09:00", "America/Atlantis").unwrap_err();
    assert!(matches!(err, AppError::Zone(_)));
}

// =========================================================================
// next_top_of_hour_local
// =========================================================================

#[test]
fn test_next_top_of_hour_rounds_up() {
    // 14:25Z is 09:25 in New York (EST).
    let next = next_top_of_hour_local(utc(2024, 1, 15, 14, 25), "America/New_York").unwrap();
    assert_eq!(next, "2024-01-15T10:00");
}

#[test]
fn test_next_top_of_hour_keeps_exact_hour() {
    let next = next_top_of_hour_local(utc(2024, 1, 15, 14, 0), "America/New_York").unwrap();
    assert_eq!(next, "2024-01-15T09:00");
}

#[test]
fn test_next_top_of_hour_rolls_over_midnight() {
    // 04:30Z on Jan 16 is 23:30 on Jan 15 in New York; the next top of
    // hour is local midnight, normalized through the converter.
    let next = next_top_of_hour_local(utc(2024, 1, 16, 4, 30), "America/New_York").unwrap();
    assert_eq!(next, "2024-01-16T00:00");
}

// =========================================================================
// plus_minutes_rounded_up
// =========================================================================

#[test]
fn test_plus_minutes_ceils_seconds() {
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 30).unwrap();
    let result = plus_minutes_rounded_up(now, 10, "America/New_York").unwrap();
    assert_eq!(result, "2024-01-15T09:11");
}

#[test]
fn test_plus_minutes_exact_minute_unchanged() {
    let now = utc(2024, 1, 15, 14, 0);
    let result = plus_minutes_rounded_up(now, 10, "America/New_York").unwrap();
    assert_eq!(result, "2024-01-15T09:10");
}

#[test]
fn test_plus_minutes_ceils_milliseconds() {
    let now = utc(2024, 1, 15, 14, 0) + Duration::milliseconds(1);
    let result = plus_minutes_rounded_up(now, 5, "UTC").unwrap();
    assert_eq!(result, "2024-01-15T14:06");
}
