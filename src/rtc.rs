//! Real-time-clock access.
//!
//! [`Rtc`] is what a peripheral driver provides: binary time, date and alarm
//! values in and out. [`RtcAdapter`] is what the dispatcher talks to. It is
//! the only place a weekday is derived, so the value written to the
//! peripheral's day register always agrees with [`calendar::weekday`].

use crate::alarm::AlarmDescriptor;
use crate::calendar;
use crate::datetime::{CalendarDate, TimeOfDay};

/// A real-time-clock peripheral with one comparator alarm.
///
/// Values cross this boundary in binary; any register encoding is the
/// implementation's business. Every write either completes or leaves the
/// previous peripheral state in place.
pub trait Rtc {
    type Error;

    fn time(&mut self) -> Result<TimeOfDay, Self::Error>;

    /// Current date including the weekday stored by the last date write.
    fn date(&mut self) -> Result<CalendarDate, Self::Error>;

    /// The programmed alarm. `enabled` reflects the alarm interrupt enable.
    fn alarm(&mut self) -> Result<AlarmDescriptor, Self::Error>;

    /// Sets the time and restarts the sub-second divider.
    fn set_time(&mut self, time: &TimeOfDay) -> Result<(), Self::Error>;

    /// Sets the date. `date.weekday` is already derived.
    fn set_date(&mut self, date: &CalendarDate) -> Result<(), Self::Error>;

    /// Programs the alarm comparator and enables its interrupt.
    fn set_alarm(&mut self, alarm: &AlarmDescriptor) -> Result<(), Self::Error>;

    /// Disables the alarm interrupt and clears any pending alarm flag.
    fn clear_alarm(&mut self) -> Result<(), Self::Error>;

    /// Clears the alarm-fired flag so the interrupt line is released, leaving
    /// the alarm armed for the next day.
    fn acknowledge_alarm(&mut self) -> Result<(), Self::Error>;
}

/// The dispatcher's view of the RTC.
pub struct RtcAdapter<R: Rtc> {
    rtc: R,
}

impl<R: Rtc> RtcAdapter<R> {
    pub fn new(rtc: R) -> Self {
        Self { rtc }
    }

    /// Gives the peripheral back, e.g. to release the bus.
    pub fn release(self) -> R {
        self.rtc
    }

    pub fn rtc(&mut self) -> &mut R {
        &mut self.rtc
    }

    pub fn get_time(&mut self) -> Result<TimeOfDay, R::Error> {
        self.rtc.time()
    }

    pub fn get_date(&mut self) -> Result<CalendarDate, R::Error> {
        self.rtc.date()
    }

    pub fn get_alarm(&mut self) -> Result<AlarmDescriptor, R::Error> {
        self.rtc.alarm()
    }

    pub fn set_time(&mut self, time: &TimeOfDay) -> Result<(), R::Error> {
        self.rtc.set_time(time)
    }

    /// Writes the date with its derived weekday and returns what was written.
    ///
    /// Any weekday carried by the caller is ignored.
    pub fn set_date(&mut self, year: u16, month: u8, day: u8) -> Result<CalendarDate, R::Error> {
        let date = CalendarDate {
            year,
            month,
            day,
            weekday: Self::weekday(year, month, day),
        };
        debug!(
            "rtc: date {}-{}-{} weekday {}",
            year, month, day, date.weekday
        );
        self.rtc.set_date(&date)?;
        Ok(date)
    }

    pub fn set_alarm(&mut self, alarm: &AlarmDescriptor) -> Result<(), R::Error> {
        self.rtc.set_alarm(alarm)
    }

    pub fn clear_alarm(&mut self) -> Result<(), R::Error> {
        self.rtc.clear_alarm()
    }

    pub fn acknowledge_alarm(&mut self) -> Result<(), R::Error> {
        self.rtc.acknowledge_alarm()
    }

    /// Weekday for a date, 1 = Monday. Out-of-range months fall back to 1
    /// so that a bad date is rejected by the peripheral rather than by a
    /// panic here.
    pub fn weekday(year: u16, month: u8, day: u8) -> u8 {
        if (1..=12).contains(&month) && day >= 1 && year >= 1 {
            calendar::weekday(year, month, day)
        } else {
            1
        }
    }

    pub fn is_leap(year: u16) -> bool {
        calendar::is_leap(year)
    }
}
