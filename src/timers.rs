//! Periodic producers.
//!
//! The `on_*_tick` callbacks suit a hardware or RTOS software timer. Hosts
//! running embassy can spawn [`run_display_tick`] and [`run_alarm_duty_tick`]
//! instead.

use embassy_time::{Ticker, Timer};

use crate::message::ClockMessage;
use crate::state::ClockShared;

impl<const N: usize> ClockShared<N> {
    /// Requests a refresh unless the alarm is ringing or the button is held,
    /// either of which owns the display.
    pub fn on_display_tick(&self) {
        let flags = self.flags();
        if !flags.alarm_active() && !flags.button_held() {
            let _ = self.mailbox().try_post(ClockMessage::RefreshDisplay);
        }
    }

    /// Advances a ringing alarm by one duty step.
    pub fn on_alarm_duty_tick(&self) {
        if self.flags().alarm_active() {
            let _ = self.mailbox().try_post(ClockMessage::AlarmFired);
        }
    }

    /// Schedules one more duty tick.
    pub fn kick_duty_tick(&self) {
        self.duty_kick.signal(());
    }
}

/// Calls [`ClockShared::on_display_tick`] every
/// [`ClockConfig::display_period`](crate::ClockConfig::display_period).
pub async fn run_display_tick<const N: usize>(shared: &ClockShared<N>) -> ! {
    let mut ticker = Ticker::every(shared.config().display_period);
    loop {
        ticker.next().await;
        shared.on_display_tick();
    }
}

/// One-shot duty timer: each kick produces one
/// [`ClockShared::on_alarm_duty_tick`] a duty period later. Stops by not
/// being kicked again.
pub async fn run_alarm_duty_tick<const N: usize>(shared: &ClockShared<N>) -> ! {
    let period = shared.config().duty_period;
    loop {
        shared.duty_kick.wait().await;
        Timer::after(period).await;
        shared.on_alarm_duty_tick();
    }
}
