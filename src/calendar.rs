//! Calendar arithmetic.
//!
//! The weekday is derived with a congruence over a March-based year, the
//! same family as Zeller's congruence: January and February count as the
//! last two months of the previous year so that the leap day falls at the
//! very end of the counted year and the 4/100/400 leap terms only depend on
//! the shifted year. Weekdays are numbered 1 (Monday) to 7 (Sunday), the
//! numbering written into the RTC day register.

/// Returns `true` for Gregorian leap years.
pub const fn is_leap(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`, or 0 for an invalid month.
pub const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days elapsed since 0000-03-01 in the proleptic Gregorian calendar.
const fn day_number(year: u16, month: u8, day: u8) -> u32 {
    let (year, month) = if month <= 2 {
        (year as u32 - 1, month as u32 + 9)
    } else {
        (year as u32, month as u32 - 3)
    };
    // (306 * m + 5) / 10 is the cumulative length of the months March..m,
    // which alternate 31/30 except for the 31/31 pairs.
    365 * year + year / 4 - year / 100 + year / 400 + (306 * month + 5) / 10 + (day as u32 - 1)
}

/// Day of week for the given date, 1 = Monday through 7 = Sunday.
///
/// `month` must be 1-12, `day` at least 1 and `year` at least 1. The day is
/// not checked against the month length: an out-of-range day simply counts
/// forward into the next month.
pub const fn weekday(year: u16, month: u8, day: u8) -> u8 {
    // 0000-03-01 was a Wednesday, two days after Monday.
    ((day_number(year, month, day) + 2) % 7) as u8 + 1
}
