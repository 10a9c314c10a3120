//! Time and date values and their DS3231 register encoding.
//!
//! [`TimeOfDay`] and [`CalendarDate`] are the binary values the clock core
//! works with. The DS3231 keeps the same values BCD encoded in two register
//! blocks: seconds/minutes/hours at 0x00 and day/date/month/year at 0x03.
//! [`RawTime`] and [`RawDate`] model those blocks and do the conversion,
//! rejecting anything the device cannot represent before it reaches the bus.
//!
//! # Error Handling
//!
//! Conversion errors are reported via [`DateTimeError`].

use chrono::{NaiveDate, NaiveTime, Weekday};

use crate::registers::{Date, Day, Hours, Minutes, Month, Seconds, TimeRepresentation, Year};

/// Hour, minute and second of the day, 24-hour.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    /// 0-23
    pub hour: u8,
    /// 0-59
    pub minute: u8,
    /// 0-59
    pub second: u8,
}

impl TimeOfDay {
    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.hour < 24 && self.minute < 60 && self.second < 60
    }

    pub fn to_naive(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )
    }
}

/// Calendar date with the derived day of week.
///
/// `weekday` is 1 (Monday) to 7 (Sunday) once the date has been written to
/// or read from the RTC. Dates built by callers carry 0 there; the RTC
/// adapter fills it in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarDate {
    /// Absolute year, e.g. 2024
    pub year: u16,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    /// 1-7, 1 = Monday, 0 = not yet derived
    pub weekday: u8,
}

impl CalendarDate {
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self {
            year,
            month,
            day,
            weekday: 0,
        }
    }

    /// The weekday as a chrono [`Weekday`], if it has been derived.
    pub fn weekday_name(&self) -> Option<Weekday> {
        self.weekday
            .checked_sub(1)
            .and_then(|days_from_monday| Weekday::try_from(days_from_monday).ok())
    }

    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors that can occur during DS3231 date/time conversion or validation.
pub enum DateTimeError {
    /// A field is out of range or a register holds an invalid BCD value
    InvalidDateTime,
    /// The year is not before 2200 (the century bit only covers 2000-2199)
    YearNotBefore2200,
    /// The year is not after 1999
    YearNotAfter1999,
}

/// Splits `value` into BCD ones and tens, rejecting values above `max_value`.
pub(crate) fn make_bcd(value: u8, max_value: u8) -> Result<(u8, u8), DateTimeError> {
    if value > max_value {
        return Err(DateTimeError::InvalidDateTime);
    }
    Ok((value % 10, value / 10))
}

/// Joins BCD ones and tens, rejecting digits above 9 and results above `max_value`.
pub(crate) fn from_bcd(ones: u8, tens: u8, max_value: u8) -> Result<u8, DateTimeError> {
    if ones > 9 || tens > 9 {
        return Err(DateTimeError::InvalidDateTime);
    }
    let value = tens * 10 + ones;
    if value > max_value {
        return Err(DateTimeError::InvalidDateTime);
    }
    Ok(value)
}

pub(crate) fn convert_hours(
    hour: u8,
    time_representation: TimeRepresentation,
) -> Result<Hours, DateTimeError> {
    if hour > 23 {
        return Err(DateTimeError::InvalidDateTime);
    }
    let mut value = Hours::default();
    value.set_time_representation(time_representation);
    match time_representation {
        TimeRepresentation::TwentyFourHour => {
            value.set_hours(hour % 10);
            value.set_ten_hours(u8::from((10..20).contains(&hour)));
            value.set_pm_or_twenty_hours(u8::from(hour >= 20));
        }
        TimeRepresentation::TwelveHour => {
            let (hour12, is_pm) = match hour {
                0 => (12, false),
                1..=11 => (hour, false),
                12 => (12, true),
                _ => (hour - 12, true),
            };
            value.set_hours(hour12 % 10);
            value.set_ten_hours(hour12 / 10);
            value.set_pm_or_twenty_hours(u8::from(is_pm));
        }
    }
    Ok(value)
}

pub(crate) fn decode_hours(
    representation: TimeRepresentation,
    pm_or_twenty: u8,
    ten_hours: u8,
    ones: u8,
) -> Result<u8, DateTimeError> {
    if ones > 9 {
        return Err(DateTimeError::InvalidDateTime);
    }
    let hours = 10 * ten_hours + ones;
    match representation {
        TimeRepresentation::TwentyFourHour => {
            let hours = hours + 20 * pm_or_twenty;
            if hours > 23 {
                return Err(DateTimeError::InvalidDateTime);
            }
            Ok(hours)
        }
        TimeRepresentation::TwelveHour => match (hours, pm_or_twenty != 0) {
            (0, _) | (13..=u8::MAX, _) => Err(DateTimeError::InvalidDateTime),
            (12, false) => Ok(0),
            (12, true) => Ok(12),
            (h, false) => Ok(h),
            (h, true) => Ok(h + 12),
        },
    }
}

/// The three timekeeping registers starting at 0x00.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct RawTime {
    seconds: Seconds,
    minutes: Minutes,
    hours: Hours,
}

impl RawTime {
    pub(crate) fn from_time(
        time: &TimeOfDay,
        time_representation: TimeRepresentation,
    ) -> Result<Self, DateTimeError> {
        let (ones, tens) = make_bcd(time.second, 59)?;
        let mut seconds = Seconds::default();
        seconds.set_seconds(ones);
        seconds.set_ten_seconds(tens);

        let (ones, tens) = make_bcd(time.minute, 59)?;
        let mut minutes = Minutes::default();
        minutes.set_minutes(ones);
        minutes.set_ten_minutes(tens);

        let hours = convert_hours(time.hour, time_representation)?;
        Ok(Self {
            seconds,
            minutes,
            hours,
        })
    }

    pub(crate) fn into_time(self) -> Result<TimeOfDay, DateTimeError> {
        let second = from_bcd(self.seconds.seconds(), self.seconds.ten_seconds(), 59)?;
        let minute = from_bcd(self.minutes.minutes(), self.minutes.ten_minutes(), 59)?;
        let hour = decode_hours(
            self.hours.time_representation(),
            self.hours.pm_or_twenty_hours(),
            self.hours.ten_hours(),
            self.hours.hours(),
        )?;
        Ok(TimeOfDay::new(hour, minute, second))
    }
}

impl From<[u8; 3]> for RawTime {
    fn from(data: [u8; 3]) -> Self {
        Self {
            seconds: Seconds(data[0]),
            minutes: Minutes(data[1]),
            hours: Hours(data[2]),
        }
    }
}

impl From<&RawTime> for [u8; 3] {
    fn from(raw: &RawTime) -> [u8; 3] {
        [raw.seconds.0, raw.minutes.0, raw.hours.0]
    }
}

/// The four calendar registers starting at 0x03.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct RawDate {
    day: Day,
    date: Date,
    month: Month,
    year: Year,
}

impl RawDate {
    /// Encodes `date` including its weekday, which must already be derived.
    pub(crate) fn from_date(date: &CalendarDate) -> Result<Self, DateTimeError> {
        if date.year > 2199 {
            error!("Year {} is too late! must be before 2200", date.year);
            return Err(DateTimeError::YearNotBefore2200);
        }
        if date.year < 2000 {
            error!("Year {} is too early! must be greater than 1999", date.year);
            return Err(DateTimeError::YearNotAfter1999);
        }
        if date.weekday == 0 || date.weekday > 7 || date.month == 0 || date.day == 0 {
            return Err(DateTimeError::InvalidDateTime);
        }

        let mut day = Day::default();
        day.set_day(date.weekday);

        let (ones, tens) = make_bcd(date.day, 31)?;
        let mut date_reg = Date::default();
        date_reg.set_date(ones);
        date_reg.set_ten_date(tens);

        let (ones, tens) = make_bcd(date.month, 12)?;
        let mut month = Month::default();
        month.set_month(ones);
        month.set_ten_month(tens);

        // Fits in a u8: the range check above bounds it to 0-199.
        let mut offset = (date.year - 2000) as u8;
        if offset > 99 {
            offset -= 100;
            month.set_century(true);
        }
        let mut year = Year::default();
        year.set_year(offset % 10);
        year.set_ten_year(offset / 10);

        let raw = Self {
            day,
            date: date_reg,
            month,
            year,
        };
        trace!("raw date={:?}", raw);
        Ok(raw)
    }

    pub(crate) fn into_date(self) -> Result<CalendarDate, DateTimeError> {
        let weekday = self.day.day();
        if weekday == 0 {
            return Err(DateTimeError::InvalidDateTime);
        }
        let day = from_bcd(self.date.date(), self.date.ten_date(), 31)?;
        let month = from_bcd(self.month.month(), self.month.ten_month(), 12)?;
        let offset = from_bcd(self.year.year(), self.year.ten_year(), 99)?;
        if day == 0 || month == 0 {
            return Err(DateTimeError::InvalidDateTime);
        }
        let century = if self.month.century() { 100 } else { 0 };
        Ok(CalendarDate {
            year: 2000 + century + u16::from(offset),
            month,
            day,
            weekday,
        })
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RawDate {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "RawDate {{ day: {}, date: {}, month: {}, year: {} }}",
            self.day,
            self.date,
            self.month,
            self.year
        );
    }
}

impl From<[u8; 4]> for RawDate {
    fn from(data: [u8; 4]) -> Self {
        Self {
            day: Day(data[0]),
            date: Date(data[1]),
            month: Month(data[2]),
            year: Year(data[3]),
        }
    }
}

impl From<&RawDate> for [u8; 4] {
    fn from(raw: &RawDate) -> [u8; 4] {
        [raw.day.0, raw.date.0, raw.month.0, raw.year.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_bcd() {
        assert_eq!(make_bcd(0, 59).unwrap(), (0, 0));
        assert_eq!(make_bcd(45, 59).unwrap(), (5, 4));
        assert_eq!(make_bcd(59, 59).unwrap(), (9, 5));
        assert!(matches!(
            make_bcd(60, 59),
            Err(DateTimeError::InvalidDateTime)
        ));
        assert!(matches!(
            make_bcd(13, 12),
            Err(DateTimeError::InvalidDateTime)
        ));
    }

    #[test]
    fn test_from_bcd_rejects_bad_digits() {
        assert_eq!(from_bcd(9, 5, 59).unwrap(), 59);
        assert!(from_bcd(10, 0, 59).is_err());
        assert!(from_bcd(0, 6, 59).is_err());
    }

    #[test]
    fn test_time_encoding_24_hour() {
        let raw =
            RawTime::from_time(&TimeOfDay::new(10, 30, 0), TimeRepresentation::TwentyFourHour)
                .unwrap();
        let bytes: [u8; 3] = (&raw).into();
        assert_eq!(bytes, [0x00, 0x30, 0x10]);

        let raw =
            RawTime::from_time(&TimeOfDay::new(23, 59, 58), TimeRepresentation::TwentyFourHour)
                .unwrap();
        let bytes: [u8; 3] = (&raw).into();
        assert_eq!(bytes, [0x58, 0x59, 0x23]);
        assert_eq!(
            RawTime::from(bytes).into_time().unwrap(),
            TimeOfDay::new(23, 59, 58)
        );
    }

    #[test]
    fn test_time_encoding_rejects_out_of_range() {
        assert!(
            RawTime::from_time(&TimeOfDay::new(24, 0, 0), TimeRepresentation::TwentyFourHour)
                .is_err()
        );
        assert!(
            RawTime::from_time(&TimeOfDay::new(0, 60, 0), TimeRepresentation::TwentyFourHour)
                .is_err()
        );
        assert!(
            RawTime::from_time(&TimeOfDay::new(0, 0, 60), TimeRepresentation::TwentyFourHour)
                .is_err()
        );
    }

    #[test]
    fn test_twelve_hour_registers_decode_to_24_hour() {
        // 1 PM: 12-hour flag, PM flag, hour 1
        let raw = RawTime::from([0x00, 0x00, 0b0110_0001]);
        assert_eq!(raw.hours.time_representation(), TimeRepresentation::TwelveHour);
        assert_eq!(raw.into_time().unwrap(), TimeOfDay::new(13, 0, 0));

        // 12 AM is midnight
        let raw = RawTime::from([0x00, 0x00, 0b0101_0010]);
        assert_eq!(raw.into_time().unwrap(), TimeOfDay::new(0, 0, 0));

        let hours = convert_hours(23, TimeRepresentation::TwelveHour).unwrap();
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.ten_hours(), 1);
        assert_eq!(hours.hours(), 1);
    }

    #[test]
    fn test_date_encoding_and_century() {
        let mut date = CalendarDate::new(2024, 3, 14);
        date.weekday = 4;
        let raw = RawDate::from_date(&date).unwrap();
        let bytes: [u8; 4] = (&raw).into();
        assert_eq!(bytes, [0x04, 0x14, 0x03, 0x24]);
        assert_eq!(RawDate::from(bytes).into_date().unwrap(), date);

        let mut date = CalendarDate::new(2100, 1, 1);
        date.weekday = 5;
        let raw = RawDate::from_date(&date).unwrap();
        let bytes: [u8; 4] = (&raw).into();
        assert_eq!(bytes, [0x05, 0x01, 0x81, 0x00]);
        assert_eq!(RawDate::from(bytes).into_date().unwrap().year, 2100);
    }

    #[test]
    fn test_date_encoding_year_bounds() {
        let mut date = CalendarDate::new(1999, 12, 31);
        date.weekday = 5;
        assert!(matches!(
            RawDate::from_date(&date),
            Err(DateTimeError::YearNotAfter1999)
        ));
        date.year = 2200;
        assert!(matches!(
            RawDate::from_date(&date),
            Err(DateTimeError::YearNotBefore2200)
        ));
    }

    #[test]
    fn test_date_encoding_requires_weekday() {
        let date = CalendarDate::new(2024, 3, 14);
        assert!(matches!(
            RawDate::from_date(&date),
            Err(DateTimeError::InvalidDateTime)
        ));
    }

    #[test]
    fn test_invalid_bcd_date_register() {
        // month 0x13 is not a month
        let raw = RawDate::from([0x01, 0x01, 0x13, 0x24]);
        assert!(matches!(
            raw.into_date(),
            Err(DateTimeError::InvalidDateTime)
        ));
    }

    #[test]
    fn test_weekday_name_and_naive_conversions() {
        let mut date = CalendarDate::new(2023, 4, 1);
        assert_eq!(date.weekday_name(), None);
        date.weekday = 6;
        assert_eq!(date.weekday_name(), Some(Weekday::Sat));
        assert_eq!(date.to_naive(), NaiveDate::from_ymd_opt(2023, 4, 1));
        assert!(CalendarDate::new(2023, 2, 30).to_naive().is_none());
        assert_eq!(
            TimeOfDay::new(7, 0, 0).to_naive(),
            NaiveTime::from_hms_opt(7, 0, 0)
        );
        assert!(!TimeOfDay::new(7, 60, 0).is_valid());
    }
}
