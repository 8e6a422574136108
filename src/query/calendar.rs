//! Solar Hijri (Persian) calendar conversion.
//!
//! Uses the 33-year arithmetic cycle, which agrees with the observational
//! calendar for the years rule authors actually write.

use time::{Date, Month};

use crate::error::{FilterError, Result};

/// Parses `yyyy/MM/dd` Solar Hijri text into the matching Gregorian date.
pub fn parse_persian_date(text: &str) -> Result<Date> {
    let mut parts = text.trim().split('/');
    let (Some(year), Some(month), Some(day), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(FilterError::malformed(format!(
            "persian date '{text}' must look like yyyy/MM/dd"
        )));
    };
    let parse = |part: &str| {
        part.trim().parse::<i64>().map_err(|_| {
            FilterError::malformed(format!("persian date '{text}' has non-numeric part '{part}'"))
        })
    };
    persian_to_gregorian(parse(year)?, parse(month)?, parse(day)?)
}

/// Converts a Solar Hijri calendar date into a Gregorian [`Date`].
pub fn persian_to_gregorian(year: i64, month: i64, day: i64) -> Result<Date> {
    if !(1..=9000).contains(&year) || !(1..=12).contains(&month) {
        return Err(FilterError::malformed(format!(
            "persian date {year}/{month}/{day} is out of range"
        )));
    }
    let month_len = match month {
        1..=6 => 31,
        7..=11 => 30,
        _ if is_leap(year) => 30,
        _ => 29,
    };
    if !(1..=month_len).contains(&day) {
        return Err(FilterError::malformed(format!(
            "persian month {month} of {year} has no day {day}"
        )));
    }
    let (gy, gm, gd) = to_gregorian_parts(year, month, day);
    let month = u8::try_from(gm)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(|| FilterError::malformed(format!("gregorian month {gm} is invalid")))?;
    let year = i32::try_from(gy)
        .map_err(|_| FilterError::malformed(format!("gregorian year {gy} is out of range")))?;
    Date::from_calendar_date(year, month, gd as u8)
        .map_err(|err| FilterError::malformed(format!("gregorian date: {err}")))
}

fn is_leap(year: i64) -> bool {
    to_gregorian_parts(year, 12, 30) != to_gregorian_parts(year + 1, 1, 1)
}

fn to_gregorian_parts(jy: i64, jm: i64, jd: i64) -> (i64, i64, i64) {
    let jy = jy + 1595;
    let mut days = -355_668 + 365 * jy + (jy / 33) * 8 + ((jy % 33) + 3) / 4 + jd
        + if jm < 7 {
            (jm - 1) * 31
        } else {
            (jm - 7) * 30 + 186
        };
    let mut gy = 400 * (days / 146_097);
    days %= 146_097;
    if days > 36_524 {
        days -= 1;
        gy += 100 * (days / 36_524);
        days %= 36_524;
        if days >= 365 {
            days += 1;
        }
    }
    gy += 4 * (days / 1461);
    days %= 1461;
    if days > 365 {
        gy += (days - 1) / 365;
        days = (days - 1) % 365;
    }
    let leap = (gy % 4 == 0 && gy % 100 != 0) || gy % 400 == 0;
    let month_days = [31, if leap { 29 } else { 28 }, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut gd = days + 1;
    let mut gm = 1;
    for len in month_days {
        if gd <= len {
            break;
        }
        gd -= len;
        gm += 1;
    }
    (gy, gm, gd)
}
