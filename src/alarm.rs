//! Alarm descriptor and DS3231 alarm 2 register encoding.
//!
//! The clock keeps a single daily alarm. [`AlarmDescriptor`] describes it
//! the way the dispatcher thinks about it: an hour and minute, whether it is
//! enabled, and a mask saying which fields the comparator ignores. The
//! DS3231 realizes it with alarm 2, which has minute precision and always
//! fires at 00 seconds, so the seconds field is wildcarded by construction.
//!
//! # Mask combinations
//!
//! Alarm 2 supports these patterns (A2M4 A2M3 A2M2):
//! - `1 1 1` every minute
//! - `1 1 0` when minutes match
//! - `1 0 0` when hours and minutes match, i.e. daily
//! - `0 0 0` when date (or weekday), hours and minutes match
//!
//! Any other combination is rejected with [`AlarmError::UnsupportedMask`].

use crate::datetime::{convert_hours, decode_hours, from_bcd, make_bcd, DateTimeError};
use crate::registers::{
    AlarmDayDate, AlarmHours, AlarmMinutes, DayDateSelect, TimeRepresentation,
};

/// Error type for alarm configuration operations.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmError {
    /// Invalid time component value
    InvalidTime(&'static str),
    /// Invalid day of week (must be 1-7) or date of month (must be 1-31)
    InvalidDay,
    /// The comparator cannot ignore this combination of fields
    UnsupportedMask,
    /// BCD conversion error
    DateTime(DateTimeError),
}

impl From<DateTimeError> for AlarmError {
    fn from(e: DateTimeError) -> Self {
        AlarmError::DateTime(e)
    }
}

bitflags::bitflags! {
    /// Fields the alarm comparator ignores.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct AlarmMask: u8 {
        const SECONDS = 1 << 0;
        const MINUTES = 1 << 1;
        const HOURS = 1 << 2;
        const DATE_WEEKDAY = 1 << 3;
    }
}

impl Default for AlarmMask {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AlarmMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "AlarmMask({=u8:#x})", self.bits())
    }
}

/// Whether the day field of an alarm is a date of month or a day of week.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DaySelect {
    /// Date of month (1-31)
    #[default]
    Date,
    /// Day of week (1-7)
    Weekday,
}

/// A configured (or read back) alarm.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmDescriptor {
    /// 0-23
    pub hour: u8,
    /// 0-59
    pub minute: u8,
    /// Alarm interrupt enabled on the peripheral
    pub enabled: bool,
    pub day_select: DaySelect,
    /// Date or weekday the comparator uses when the day is not masked
    pub day: u8,
    pub mask: AlarmMask,
}

impl AlarmDescriptor {
    /// The daily alarm the clock arms: seconds and date are wildcarded so it
    /// fires once a day at `hour:minute`.
    pub const fn daily(hour: u8, minute: u8) -> Self {
        Self {
            hour,
            minute,
            enabled: true,
            day_select: DaySelect::Date,
            day: 1,
            mask: AlarmMask::SECONDS.union(AlarmMask::DATE_WEEKDAY),
        }
    }

    /// Validates the descriptor against what the comparator can express.
    ///
    /// # Errors
    ///
    /// Returns an error if any component is out of range or the mask is not
    /// one of the supported patterns.
    pub fn validate(&self) -> Result<(), AlarmError> {
        if self.hour > 23 {
            return Err(AlarmError::InvalidTime("hours must be 0-23"));
        }
        if self.minute > 59 {
            return Err(AlarmError::InvalidTime("minutes must be 0-59"));
        }
        let minutes = self.mask.contains(AlarmMask::MINUTES);
        let hours = self.mask.contains(AlarmMask::HOURS);
        let day = self.mask.contains(AlarmMask::DATE_WEEKDAY);
        match (day, hours, minutes) {
            (true, true, true) | (true, true, false) | (true, false, false) => Ok(()),
            (false, false, false) => match self.day_select {
                DaySelect::Date if (1..=31).contains(&self.day) => Ok(()),
                DaySelect::Weekday if (1..=7).contains(&self.day) => Ok(()),
                _ => Err(AlarmError::InvalidDay),
            },
            _ => Err(AlarmError::UnsupportedMask),
        }
    }
}

/// The three alarm 2 registers starting at 0x0B.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct RawAlarm {
    minutes: AlarmMinutes,
    hours: AlarmHours,
    day_date: AlarmDayDate,
}

impl RawAlarm {
    /// Encodes `alarm` in 24-hour format. `enabled` is not part of these
    /// registers; it lives in the control register.
    pub(crate) fn from_descriptor(alarm: &AlarmDescriptor) -> Result<Self, AlarmError> {
        alarm.validate()?;

        let (ones, tens) = make_bcd(alarm.minute, 59)?;
        let mut minutes = AlarmMinutes::default();
        minutes.set_minutes(ones);
        minutes.set_ten_minutes(tens);
        minutes.set_mask(alarm.mask.contains(AlarmMask::MINUTES));

        let hour_reg = convert_hours(alarm.hour, TimeRepresentation::TwentyFourHour)?;
        let mut hours = AlarmHours::default();
        hours.set_time_representation(TimeRepresentation::TwentyFourHour);
        hours.set_hours(hour_reg.hours());
        hours.set_ten_hours(hour_reg.ten_hours());
        hours.set_pm_or_twenty_hours(hour_reg.pm_or_twenty_hours());
        hours.set_mask(alarm.mask.contains(AlarmMask::HOURS));

        let mut day_date = AlarmDayDate::default();
        match alarm.day_select {
            DaySelect::Weekday => {
                day_date.set_day_date_select(DayDateSelect::Day);
                day_date.set_day_or_date(alarm.day);
            }
            DaySelect::Date => {
                let (ones, tens) = make_bcd(alarm.day, 31)?;
                day_date.set_day_date_select(DayDateSelect::Date);
                day_date.set_day_or_date(ones);
                day_date.set_ten_date(tens);
            }
        }
        day_date.set_mask(alarm.mask.contains(AlarmMask::DATE_WEEKDAY));

        Ok(Self {
            minutes,
            hours,
            day_date,
        })
    }

    /// Decodes the registers. Seconds always read back as masked because
    /// alarm 2 has no seconds register.
    pub(crate) fn into_descriptor(self, enabled: bool) -> Result<AlarmDescriptor, AlarmError> {
        let minute = from_bcd(self.minutes.minutes(), self.minutes.ten_minutes(), 59)?;
        let hour = decode_hours(
            self.hours.time_representation(),
            self.hours.pm_or_twenty_hours(),
            self.hours.ten_hours(),
            self.hours.hours(),
        )?;
        let (day_select, day) = match self.day_date.day_date_select() {
            DayDateSelect::Day => (DaySelect::Weekday, self.day_date.day_or_date()),
            DayDateSelect::Date => (
                DaySelect::Date,
                from_bcd(self.day_date.day_or_date(), self.day_date.ten_date(), 31)?,
            ),
        };

        let mut mask = AlarmMask::SECONDS;
        if self.minutes.mask() {
            mask = mask | AlarmMask::MINUTES;
        }
        if self.hours.mask() {
            mask = mask | AlarmMask::HOURS;
        }
        if self.day_date.mask() {
            mask = mask | AlarmMask::DATE_WEEKDAY;
        }

        let alarm = AlarmDescriptor {
            hour,
            minute,
            enabled,
            day_select,
            day,
            mask,
        };
        alarm.validate()?;
        Ok(alarm)
    }
}

impl From<[u8; 3]> for RawAlarm {
    fn from(data: [u8; 3]) -> Self {
        Self {
            minutes: AlarmMinutes(data[0]),
            hours: AlarmHours(data[1]),
            day_date: AlarmDayDate(data[2]),
        }
    }
}

impl From<&RawAlarm> for [u8; 3] {
    fn from(raw: &RawAlarm) -> [u8; 3] {
        [raw.minutes.0, raw.hours.0, raw.day_date.0]
    }
}
