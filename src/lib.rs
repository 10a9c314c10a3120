#![no_std]
//! Clock coordination core for a desk clock.
//!
//! Interrupt handlers and timers post [`ClockMessage`]s into the mailbox of
//! a shared [`ClockShared`]; one [`ClockDispatcher`] drains it periodically,
//! drives the RTC and the buzzer, and publishes [`DisplayMessage`]s for the
//! rendering task. [`Ds3231`] is the bundled RTC driver.

#[macro_use]
mod fmt;

pub mod alarm;
pub mod buzzer;
pub mod calendar;
pub mod config;
pub mod datetime;
pub mod diagnostics;
pub mod dispatcher;
pub mod display;
pub mod ds3231;
pub mod mailbox;
pub mod message;
pub mod registers;
pub mod rtc;
pub mod state;
pub mod timers;

pub use alarm::{AlarmDescriptor, AlarmError, AlarmMask, DaySelect};
pub use buzzer::Buzzer;
pub use config::ClockConfig;
pub use datetime::{CalendarDate, DateTimeError, TimeOfDay};
pub use diagnostics::Diagnostics;
pub use dispatcher::ClockDispatcher;
pub use display::{DisplayPublisher, DisplayQueue};
pub use ds3231::{Ds3231, Ds3231Error};
pub use mailbox::{Mailbox, MailboxFull};
pub use message::{ClockMessage, DisplayIntent, DisplayMessage, Event, UnknownEvent};
pub use rtc::{Rtc, RtcAdapter};
pub use state::{ClockFlags, ClockShared, SubmitError};
pub use timers::{run_alarm_duty_tick, run_display_tick};
