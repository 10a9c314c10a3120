//! State shared between interrupt context, timers and the dispatcher.
//!
//! A board crate keeps one [`ClockShared`] in a `static` and calls the
//! `on_*` callbacks from its interrupt handlers. None of them block, lock
//! anything but a critical section, or log.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant};

use crate::config::ClockConfig;
use crate::datetime::{CalendarDate, TimeOfDay};
use crate::diagnostics::{Counter, Diagnostics};
use crate::mailbox::{Mailbox, MailboxFull};
use crate::message::{ClockMessage, UnknownEvent};

/// The three coordination flags.
///
/// Only `load` and `store` are used, so they work on cores without
/// compare-and-swap.
pub struct ClockFlags {
    /// Written by the dispatcher only.
    alarm_armed: AtomicBool,
    /// Set by the alarm interrupt, cleared by the dispatcher.
    alarm_active: AtomicBool,
    /// Written by the button interrupts only.
    button_held: AtomicBool,
}

impl ClockFlags {
    pub const fn new() -> Self {
        Self {
            alarm_armed: AtomicBool::new(false),
            alarm_active: AtomicBool::new(false),
            button_held: AtomicBool::new(false),
        }
    }

    pub fn alarm_armed(&self) -> bool {
        self.alarm_armed.load(Ordering::Acquire)
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm_active.load(Ordering::Acquire)
    }

    pub fn button_held(&self) -> bool {
        self.button_held.load(Ordering::Acquire)
    }

    pub(crate) fn set_alarm_armed(&self, armed: bool) {
        self.alarm_armed.store(armed, Ordering::Release);
    }

    pub(crate) fn set_alarm_active(&self, active: bool) {
        self.alarm_active.store(active, Ordering::Release);
    }

    pub(crate) fn set_button_held(&self, held: bool) {
        self.button_held.store(held, Ordering::Release);
    }
}

impl Default for ClockFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the transport's message did not make it into the mailbox.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubmitError {
    /// Only time, date and alarm updates come from the transport
    NotConfiguration,
    UnknownEvent(UnknownEvent),
    MailboxFull,
}

impl From<MailboxFull> for SubmitError {
    fn from(_: MailboxFull) -> Self {
        SubmitError::MailboxFull
    }
}

impl From<UnknownEvent> for SubmitError {
    fn from(e: UnknownEvent) -> Self {
        SubmitError::UnknownEvent(e)
    }
}

/// Everything the producers and the dispatcher share.
pub struct ClockShared<const N: usize> {
    mailbox: Mailbox<N>,
    flags: ClockFlags,
    /// Time of the last button release
    released_at: Mutex<Cell<Option<Instant>>>,
    config: ClockConfig,
    pub(crate) duty_kick: Signal<CriticalSectionRawMutex, ()>,
    bounces_filtered: Counter,
    unknown_events: Counter,
}

impl<const N: usize> ClockShared<N> {
    pub const fn new(config: ClockConfig) -> Self {
        Self {
            mailbox: Mailbox::new(),
            flags: ClockFlags::new(),
            released_at: Mutex::new(Cell::new(None)),
            config,
            duty_kick: Signal::new(),
            bounces_filtered: Counter::new(),
            unknown_events: Counter::new(),
        }
    }

    pub fn mailbox(&self) -> &Mailbox<N> {
        &self.mailbox
    }

    pub fn flags(&self) -> &ClockFlags {
        &self.flags
    }

    /// Settings shared by the callbacks, the runners and the dispatcher.
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Button pressed (line pulled low).
    ///
    /// Emits `AlarmSilence` while the alarm rings, otherwise
    /// `AlarmButtonDisplay`. A press closer than the debounce window to the
    /// previous release only updates the held flag.
    pub fn on_button_falling(&self, now: Instant) {
        self.flags.set_button_held(true);

        let released_at = critical_section::with(|cs| self.released_at.borrow(cs).get());
        let bounce = released_at
            .and_then(|at| now.checked_duration_since(at))
            .is_some_and(|since| since < self.config.debounce);
        if bounce {
            self.bounces_filtered.increment();
            return;
        }

        let msg = if self.flags.alarm_active() {
            ClockMessage::AlarmSilence
        } else {
            ClockMessage::AlarmButtonDisplay
        };
        // a full mailbox is counted there
        let _ = self.mailbox.try_post(msg);
    }

    /// Button released.
    pub fn on_button_rising(&self, now: Instant) {
        self.flags.set_button_held(false);
        critical_section::with(|cs| self.released_at.borrow(cs).set(Some(now)));
    }

    /// The RTC alarm line asserted.
    ///
    /// Ignored unless an alarm is armed. Starts the duty cycle; the first
    /// `AlarmFired` arrives one duty period later.
    pub fn on_alarm_fired(&self) {
        if !self.flags.alarm_armed() {
            return;
        }
        self.flags.set_alarm_active(true);
        self.duty_kick.signal(());
    }

    /// Clears `alarm_armed`, then `alarm_active`, then any pending duty
    /// kick. An alarm interrupt landing between the stores sees nothing
    /// armed and leaves `alarm_active` alone.
    pub(crate) fn disarm(&self) {
        self.flags.set_alarm_armed(false);
        self.flags.set_alarm_active(false);
        self.duty_kick.reset();
    }

    /// Queues a configuration message from the transport task, waiting up
    /// to `timeout` for room.
    pub async fn submit_config(
        &self,
        msg: ClockMessage,
        timeout: Duration,
    ) -> Result<(), SubmitError> {
        if !msg.is_configuration() {
            warn!("clock: rejected non-configuration event {}", u8::from(msg.event()));
            return Err(SubmitError::NotConfiguration);
        }
        self.mailbox.post(msg, timeout).await?;
        Ok(())
    }

    /// Raw-tag entry for the transport parser, using the configured send
    /// timeout.
    pub async fn submit_tagged(
        &self,
        tag: u8,
        time: TimeOfDay,
        date: CalendarDate,
    ) -> Result<(), SubmitError> {
        let msg = ClockMessage::from_tag(tag, time, date).map_err(|e| {
            warn!("clock: unknown event tag {}", tag);
            self.unknown_events.increment();
            e
        })?;
        self.submit_config(msg, self.config.send_timeout).await
    }

    /// Producer-side counters. [`ClockDispatcher::diagnostics`] reports
    /// these together with the dispatcher's own.
    ///
    /// [`ClockDispatcher::diagnostics`]: crate::ClockDispatcher::diagnostics
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            mailbox_dropped: self.mailbox.dropped(),
            bounces_filtered: self.bounces_filtered.get(),
            unknown_events: self.unknown_events.get(),
            ..Default::default()
        }
    }
}
