//! Messages crossing the two queues.
//!
//! [`ClockMessage`] flows into the dispatcher from interrupts, timers and the
//! transport task. [`DisplayMessage`] flows out to the rendering task. The
//! two are separate types and every variant or constructor carries only the
//! fields its event uses, so nothing from a previous message can leak into
//! the next one.

use crate::alarm::AlarmDescriptor;
use crate::datetime::{CalendarDate, TimeOfDay};

/// What happened, without its payload.
///
/// The discriminants are the tags used on the transport boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Event {
    None = 0,
    ApplyTime = 1,
    ApplyDate = 2,
    ApplyAlarm = 3,
    RefreshDisplay = 4,
    /// A duty-cycle step of a ringing alarm
    AlarmFired = 5,
    AlarmSilence = 6,
    /// Short press: show whether an alarm is set
    AlarmButtonDisplay = 7,
}

/// A tag that does not name any [`Event`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnknownEvent(pub u8);

impl TryFrom<u8> for Event {
    type Error = UnknownEvent;

    fn try_from(tag: u8) -> Result<Self, UnknownEvent> {
        Ok(match tag {
            0 => Event::None,
            1 => Event::ApplyTime,
            2 => Event::ApplyDate,
            3 => Event::ApplyAlarm,
            4 => Event::RefreshDisplay,
            5 => Event::AlarmFired,
            6 => Event::AlarmSilence,
            7 => Event::AlarmButtonDisplay,
            _ => return Err(UnknownEvent(tag)),
        })
    }
}

impl From<Event> for u8 {
    fn from(event: Event) -> u8 {
        event as u8
    }
}

/// An entry in the clock mailbox.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockMessage {
    #[default]
    None,
    ApplyTime(TimeOfDay),
    /// The weekday of the date is ignored; the RTC adapter derives it.
    ApplyDate(CalendarDate),
    /// Toggles the daily alarm, arming it at `hour:minute`.
    ApplyAlarm {
        hour: u8,
        minute: u8,
    },
    RefreshDisplay,
    AlarmFired,
    AlarmSilence,
    AlarmButtonDisplay,
}

impl ClockMessage {
    pub const fn event(&self) -> Event {
        match self {
            ClockMessage::None => Event::None,
            ClockMessage::ApplyTime(_) => Event::ApplyTime,
            ClockMessage::ApplyDate(_) => Event::ApplyDate,
            ClockMessage::ApplyAlarm { .. } => Event::ApplyAlarm,
            ClockMessage::RefreshDisplay => Event::RefreshDisplay,
            ClockMessage::AlarmFired => Event::AlarmFired,
            ClockMessage::AlarmSilence => Event::AlarmSilence,
            ClockMessage::AlarmButtonDisplay => Event::AlarmButtonDisplay,
        }
    }

    /// Builds a message from a raw tag and the flat fields a transport frame
    /// carries. `ApplyAlarm` takes its hour and minute from `time`; fields
    /// the event does not use are dropped.
    pub fn from_tag(tag: u8, time: TimeOfDay, date: CalendarDate) -> Result<Self, UnknownEvent> {
        Ok(match Event::try_from(tag)? {
            Event::None => ClockMessage::None,
            Event::ApplyTime => ClockMessage::ApplyTime(time),
            Event::ApplyDate => {
                ClockMessage::ApplyDate(CalendarDate::new(date.year, date.month, date.day))
            }
            Event::ApplyAlarm => ClockMessage::ApplyAlarm {
                hour: time.hour,
                minute: time.minute,
            },
            Event::RefreshDisplay => ClockMessage::RefreshDisplay,
            Event::AlarmFired => ClockMessage::AlarmFired,
            Event::AlarmSilence => ClockMessage::AlarmSilence,
            Event::AlarmButtonDisplay => ClockMessage::AlarmButtonDisplay,
        })
    }

    /// `true` for the events the transport task is allowed to submit.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            ClockMessage::ApplyTime(_) | ClockMessage::ApplyDate(_) | ClockMessage::ApplyAlarm { .. }
        )
    }
}

/// What the rendering task should do with a snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayIntent {
    /// The alarm is ringing
    AlarmActive,
    /// Status view: an alarm is set, see `alarm`
    AlarmSet,
    /// Status view: no alarm is set
    AlarmNotSet,
    /// `time` and `date` are ready to be formatted
    TimeDate,
    /// Push the formatted frame to the panel. The clock never sends this;
    /// the rendering task uses it on its own queue.
    Render,
    /// The RTC rejected an access; the shown time may be stale
    Fault,
}

/// A display-ready snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayMessage {
    pub intent: DisplayIntent,
    pub time: TimeOfDay,
    pub date: CalendarDate,
    pub alarm: AlarmDescriptor,
    pub alarm_armed: bool,
}

impl DisplayMessage {
    const fn bare(intent: DisplayIntent, alarm_armed: bool) -> Self {
        Self {
            intent,
            time: TimeOfDay::new(0, 0, 0),
            date: CalendarDate::new(0, 0, 0),
            alarm: AlarmDescriptor {
                hour: 0,
                minute: 0,
                enabled: false,
                day_select: crate::alarm::DaySelect::Date,
                day: 0,
                mask: crate::alarm::AlarmMask::empty(),
            },
            alarm_armed,
        }
    }

    pub const fn time_date(
        time: TimeOfDay,
        date: CalendarDate,
        alarm: AlarmDescriptor,
        alarm_armed: bool,
    ) -> Self {
        Self {
            intent: DisplayIntent::TimeDate,
            time,
            date,
            alarm,
            alarm_armed,
        }
    }

    /// `AlarmSet` or `AlarmNotSet` depending on `alarm_armed`.
    pub const fn alarm_status(alarm: AlarmDescriptor, alarm_armed: bool) -> Self {
        let mut msg = if alarm_armed {
            Self::bare(DisplayIntent::AlarmSet, true)
        } else {
            Self::bare(DisplayIntent::AlarmNotSet, false)
        };
        msg.alarm = alarm;
        msg
    }

    pub const fn alarm_active() -> Self {
        Self::bare(DisplayIntent::AlarmActive, true)
    }

    pub const fn fault(alarm_armed: bool) -> Self {
        Self::bare(DisplayIntent::Fault, alarm_armed)
    }
}
