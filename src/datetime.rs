//! Date-time text handling
//!
//! The service takes range bounds as `MM/DD/YYYY HH:mm:ss` and answers with
//! one of several formats depending on the call:
//!
//! | Example                  | Shape                               |
//! |--------------------------|-------------------------------------|
//! | `2017-12-21 14:00:05.0`  | ISO-ish date, fractional seconds    |
//! | `12/21/2017 20:49:58`    | 24-hour, two space-separated parts  |
//! | `12/21/17 02:00 PM`      | two-digit year, hour plus meridiem  |
//! | `12/21/0017 02:00 PM`    | year sent as `00YY`                 |
//! | `12/21/2017 02:00 PM`    | four-digit year, hour plus meridiem |
//!
//! The `00YY` form is corrected by replacing the first year digit with `2`
//! before parsing, so `0017` reads as `2017`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::error::{Result, SilverError};

/// Format for range-query bounds
pub const RANGE_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Render a bound in the format the service expects. The instant's own offset
/// is used as-is.
pub fn format_range_bound<T: TimeZone>(instant: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    instant.format(RANGE_FORMAT).to_string()
}

fn invalid(text: &str, reason: &str) -> SilverError {
    SilverError::InvalidResponse(format!("Unparseable timestamp {:?}: {}", text, reason))
}

/// Parse a timestamp from the service as local time in `tz`
pub fn parse_timestamp(text: &str, tz: Tz) -> Result<DateTime<Tz>> {
    let text = text.trim();
    let naive = parse_naive(text)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| invalid(text, "local time does not exist in timezone"))
}

fn parse_naive(text: &str) -> Result<NaiveDateTime> {
    if text.contains('.') {
        return NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|e| invalid(text, &e.to_string()));
    }

    let parts: Vec<&str> = text.split(' ').collect();
    if parts.len() == 2 {
        return NaiveDateTime::parse_from_str(text, "%m/%d/%Y %H:%M:%S")
            .map_err(|e| invalid(text, &e.to_string()));
    }

    let year = parts[0]
        .split('/')
        .nth(2)
        .ok_or_else(|| invalid(text, "expected MM/DD/YY[YY]"))?;

    if year.len() == 2 {
        return parse_with_meridiem(text, "%m/%d/%y");
    }

    if text.get(6..8) == Some("00") {
        let corrected = format!("{}2{}", &text[..6], &text[7..]);
        return parse_with_meridiem(&corrected, "%m/%d/%Y");
    }

    parse_with_meridiem(text, "%m/%d/%Y")
}

/// `<date> HH:mm AM|PM`. The hour is read on a 24-hour clock and then
/// adjusted by the meridiem: PM adds twelve to hours below twelve, AM maps
/// twelve to zero. `14:00 PM` is therefore 14:00.
fn parse_with_meridiem(text: &str, date_format: &str) -> Result<NaiveDateTime> {
    let mut parts = text.split_whitespace();
    let (Some(date), Some(time), Some(meridiem), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid(text, "expected <date> HH:mm AM|PM"));
    };

    let date =
        NaiveDate::parse_from_str(date, date_format).map_err(|e| invalid(text, &e.to_string()))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|e| invalid(text, &e.to_string()))?;

    let hour = match (meridiem.to_ascii_uppercase().as_str(), time.hour()) {
        ("PM", h) if h < 12 => h + 12,
        ("AM", 12) => 0,
        ("AM" | "PM", h) => h,
        _ => return Err(invalid(text, "expected AM or PM")),
    };
    let time = time
        .with_hour(hour)
        .ok_or_else(|| invalid(text, "hour out of range"))?;

    Ok(date.and_time(time))
}
