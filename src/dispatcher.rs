//! The single consumer of the clock mailbox.
//!
//! [`ClockDispatcher`] owns the RTC and the buzzer, so every mutation of
//! time, date and alarm state happens here, one message at a time. The
//! periodic task calls [`ClockDispatcher::dispatch`] once per period.
//!
//! Peripheral failures never escape `dispatch`: they are logged, counted,
//! reported to the display as a `Fault` snapshot, and the state change the
//! message asked for is abandoned.

use embedded_hal::digital::OutputPin;

use crate::alarm::AlarmDescriptor;
use crate::buzzer::Buzzer;
use crate::datetime::{CalendarDate, TimeOfDay};
use crate::diagnostics::Diagnostics;
use crate::display::DisplayPublisher;
use crate::message::{ClockMessage, DisplayMessage};
use crate::rtc::{Rtc, RtcAdapter};
use crate::state::ClockShared;

pub struct ClockDispatcher<'a, R, P, D, const N: usize>
where
    R: Rtc,
    P: OutputPin,
    D: DisplayPublisher,
{
    shared: &'a ClockShared<N>,
    rtc: RtcAdapter<R>,
    buzzer: Buzzer<P>,
    display: D,
    /// Duty advances of the current ringing, reset by every silence
    duty_count: u32,
    rtc_faults: u32,
}

impl<'a, R, P, D, const N: usize> ClockDispatcher<'a, R, P, D, N>
where
    R: Rtc,
    P: OutputPin,
    D: DisplayPublisher,
{
    /// Settings, the duty bound included, come from `shared`.
    pub fn new(shared: &'a ClockShared<N>, rtc: R, buzzer: Buzzer<P>, display: D) -> Self {
        Self {
            shared,
            rtc: RtcAdapter::new(rtc),
            buzzer,
            display,
            duty_count: 0,
            rtc_faults: 0,
        }
    }

    /// Gives back the RTC and the buzzer pin.
    pub fn release(self) -> (R, P) {
        (self.rtc.release(), self.buzzer.release())
    }

    pub fn rtc(&mut self) -> &mut RtcAdapter<R> {
        &mut self.rtc
    }

    pub fn buzzer(&self) -> &Buzzer<P> {
        &self.buzzer
    }

    pub fn duty_count(&self) -> u32 {
        self.duty_count
    }

    /// Every counter of the clock, producer side included.
    pub fn diagnostics(&self) -> Diagnostics {
        self.shared.diagnostics().merge(Diagnostics {
            rtc_faults: self.rtc_faults,
            display_dropped: self.display.dropped(),
            ..Default::default()
        })
    }

    /// Handles the messages that were pending when called and returns how
    /// many. Anything posted meanwhile, including by the handlers, waits
    /// for the next call.
    pub fn dispatch(&mut self) -> usize {
        let pending = self.shared.mailbox().pending();
        let mut handled = 0;
        while handled < pending {
            let Some(msg) = self.shared.mailbox().try_take() else {
                break;
            };
            self.handle(msg);
            handled += 1;
        }
        handled
    }

    fn handle(&mut self, msg: ClockMessage) {
        trace!("clock: handling event {}", u8::from(msg.event()));
        match msg {
            ClockMessage::None => {}
            ClockMessage::ApplyTime(time) => self.apply_time(time),
            ClockMessage::ApplyDate(date) => self.apply_date(date),
            ClockMessage::ApplyAlarm { hour, minute } => self.apply_alarm(hour, minute),
            ClockMessage::RefreshDisplay => self.publish_time_date(),
            ClockMessage::AlarmFired => self.advance_alarm(),
            ClockMessage::AlarmSilence => self.silence(),
            ClockMessage::AlarmButtonDisplay => self.show_alarm(),
        }
    }

    fn apply_time(&mut self, time: TimeOfDay) {
        if self.rtc.set_time(&time).is_err() {
            self.fault("set_time");
            return;
        }
        info!("clock: time set to {}:{}:{}", time.hour, time.minute, time.second);
        if self.shared.flags().alarm_active() {
            self.silence();
        }
        self.publish_time_date();
    }

    fn apply_date(&mut self, date: CalendarDate) {
        if self.rtc.set_date(date.year, date.month, date.day).is_err() {
            self.fault("set_date");
            return;
        }
        info!("clock: date set to {}-{}-{}", date.year, date.month, date.day);
        if self.shared.flags().alarm_active() {
            self.silence();
        }
        self.publish_time_date();
    }

    /// Toggles the daily alarm.
    fn apply_alarm(&mut self, hour: u8, minute: u8) {
        let shared = self.shared;
        let flags = shared.flags();
        if flags.alarm_armed() {
            info!("clock: alarm disarmed");
            self.silence();
            return;
        }

        let alarm = AlarmDescriptor::daily(hour, minute);
        flags.set_alarm_armed(true);
        if self.rtc.set_alarm(&alarm).is_err() {
            shared.disarm();
            self.fault("set_alarm");
            return;
        }
        info!("clock: alarm armed for {}:{}", hour, minute);
        self.display.publish(DisplayMessage::alarm_status(alarm, true));
    }

    /// One duty step of a ringing alarm.
    fn advance_alarm(&mut self) {
        if !self.shared.flags().alarm_active() {
            debug!("clock: stray alarm step ignored");
            return;
        }

        if self.duty_count == 0 {
            // releases the interrupt line; the comparator stays armed for tomorrow
            if self.rtc.acknowledge_alarm().is_err() {
                self.fault("acknowledge_alarm");
            }
            info!("clock: alarm ringing");
            self.display.publish(DisplayMessage::alarm_active());
        }

        if self.buzzer.toggle().is_err() {
            warn!("clock: buzzer toggle failed");
        }
        self.duty_count += 1;

        if self.duty_count >= self.shared.config().duty_cycle_bound {
            info!("clock: alarm timed out after {} steps", self.duty_count);
            self.silence();
        } else {
            self.shared.kick_duty_tick();
        }
    }

    /// Stops the alarm and disarms it. Safe to repeat.
    ///
    /// Local state is always cleared. If the comparator cannot be disabled
    /// the peripheral may still assert its line, which the alarm interrupt
    /// ignores while nothing is armed.
    fn silence(&mut self) {
        self.shared.disarm();
        self.duty_count = 0;

        if self.buzzer.off().is_err() {
            warn!("clock: buzzer off failed");
        }
        if self.rtc.clear_alarm().is_err() {
            self.fault("clear_alarm");
            return;
        }
        self.display
            .publish(DisplayMessage::alarm_status(AlarmDescriptor::default(), false));
    }

    fn show_alarm(&mut self) {
        match self.rtc.get_alarm() {
            Ok(alarm) => {
                let armed = self.shared.flags().alarm_armed();
                self.display.publish(DisplayMessage::alarm_status(alarm, armed));
            }
            Err(_) => self.fault("get_alarm"),
        }
    }

    fn publish_time_date(&mut self) {
        match self.read_snapshot() {
            Ok(msg) => self.display.publish(msg),
            Err(_) => self.fault("read"),
        }
    }

    fn read_snapshot(&mut self) -> Result<DisplayMessage, R::Error> {
        let time = self.rtc.get_time()?;
        let date = self.rtc.get_date()?;
        let alarm = self.rtc.get_alarm()?;
        Ok(DisplayMessage::time_date(
            time,
            date,
            alarm,
            self.shared.flags().alarm_armed(),
        ))
    }

    fn fault(&mut self, op: &str) {
        warn!("clock: rtc {} failed", op);
        self.rtc_faults = self.rtc_faults.wrapping_add(1);
        self.display
            .publish(DisplayMessage::fault(self.shared.flags().alarm_armed()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmMask;
    use crate::config::ClockConfig;
    use crate::display::DisplayQueue;
    use crate::message::DisplayIntent;
    use crate::rtc::fake::FakeRtc;
    use core::convert::Infallible;
    use embassy_time::Instant;
    use embedded_hal::digital::ErrorType;

    #[derive(Debug, Default)]
    struct FakePin {
        high: bool,
        toggles: u32,
    }

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            if self.high {
                self.toggles += 1;
            }
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            if !self.high {
                self.toggles += 1;
            }
            self.high = true;
            Ok(())
        }
    }

    type Dispatcher<'a> = ClockDispatcher<'a, FakeRtc, FakePin, &'a DisplayQueue<16>, 8>;

    fn dispatcher<'a>(
        shared: &'a ClockShared<8>,
        display: &'a DisplayQueue<16>,
    ) -> Dispatcher<'a> {
        let buzzer = Buzzer::new(FakePin::default()).unwrap();
        ClockDispatcher::new(shared, FakeRtc::default(), buzzer, display)
    }

    fn post(shared: &ClockShared<8>, msg: ClockMessage) {
        shared.mailbox().try_post(msg).unwrap();
    }

    fn drain(display: &DisplayQueue<16>) {
        while display.try_take().is_some() {}
    }

    /// Arms a 07:00 alarm and lets it fire.
    fn ring(shared: &ClockShared<8>, dispatcher: &mut Dispatcher<'_>) {
        post(shared, ClockMessage::ApplyAlarm { hour: 7, minute: 0 });
        dispatcher.dispatch();
        dispatcher.rtc().rtc().alarm_flag = true;
        shared.on_alarm_fired();
    }

    #[test]
    fn test_apply_time_publishes_snapshot() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        dispatcher.rtc().rtc().date = CalendarDate {
            year: 2024,
            month: 3,
            day: 14,
            weekday: 4,
        };

        post(&shared, ClockMessage::ApplyTime(TimeOfDay::new(10, 30, 0)));
        assert_eq!(dispatcher.dispatch(), 1);

        assert_eq!(dispatcher.rtc().get_time().unwrap(), TimeOfDay::new(10, 30, 0));
        let msg = display.try_take().unwrap();
        assert_eq!(msg.intent, DisplayIntent::TimeDate);
        assert_eq!(msg.time, TimeOfDay::new(10, 30, 0));
        assert_eq!(msg.date.year, 2024);
        assert!(!msg.alarm_armed);
    }

    #[test]
    fn test_apply_date_derives_weekday() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);

        let mut date = CalendarDate::new(2023, 4, 1);
        date.weekday = 2;
        post(&shared, ClockMessage::ApplyDate(date));
        dispatcher.dispatch();

        let written = dispatcher.rtc().get_date().unwrap();
        assert_eq!(written.weekday, 6);
        let msg = display.try_take().unwrap();
        assert_eq!(msg.date.weekday, 6);
    }

    #[test]
    fn test_apply_alarm_arms_daily_comparator() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);

        post(&shared, ClockMessage::ApplyAlarm { hour: 7, minute: 0 });
        dispatcher.dispatch();

        assert!(shared.flags().alarm_armed());
        let alarm = dispatcher.rtc().get_alarm().unwrap();
        assert_eq!((alarm.hour, alarm.minute), (7, 0));
        assert!(alarm.enabled);
        assert!(alarm.mask.contains(AlarmMask::SECONDS | AlarmMask::DATE_WEEKDAY));
        assert!(!alarm.mask.contains(AlarmMask::HOURS));

        let msg = display.try_take().unwrap();
        assert_eq!(msg.intent, DisplayIntent::AlarmSet);
        assert_eq!(msg.alarm, alarm);
    }

    #[test]
    fn test_apply_alarm_toggles_off() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);

        post(&shared, ClockMessage::ApplyAlarm { hour: 7, minute: 0 });
        post(&shared, ClockMessage::ApplyAlarm { hour: 8, minute: 0 });
        assert_eq!(dispatcher.dispatch(), 2);

        assert!(!shared.flags().alarm_armed());
        assert!(!dispatcher.rtc().get_alarm().unwrap().enabled);
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::AlarmSet);
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::AlarmNotSet);
    }

    #[test]
    fn test_full_duty_cycle_then_auto_silence() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        ring(&shared, &mut dispatcher);
        drain(&display);
        assert!(shared.flags().alarm_active());

        let mut advances = 0;
        while shared.flags().alarm_active() {
            shared.on_alarm_duty_tick();
            assert_eq!(dispatcher.dispatch(), 1);
            advances += 1;
            assert!(advances <= 60);
        }
        assert_eq!(advances, 60);

        assert!(!shared.flags().alarm_armed());
        assert!(!dispatcher.buzzer().is_on());
        assert_eq!(dispatcher.duty_count(), 0);
        assert!(!dispatcher.rtc().rtc().alarm_flag);
        assert!(!dispatcher.rtc().get_alarm().unwrap().enabled);

        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::AlarmActive);
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::AlarmNotSet);
        assert_eq!(display.try_take(), None);

        let (_, pin) = dispatcher.release();
        assert_eq!(pin.toggles, 60);
    }

    #[test]
    fn test_duty_bound_is_configurable() {
        let shared = ClockShared::new(ClockConfig {
            duty_cycle_bound: 3,
            ..ClockConfig::new()
        });
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        ring(&shared, &mut dispatcher);

        for _ in 0..3 {
            shared.on_alarm_duty_tick();
            dispatcher.dispatch();
        }
        assert!(!shared.flags().alarm_active());
    }

    #[test]
    fn test_silence_resets_bound_for_next_alarm() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);

        ring(&shared, &mut dispatcher);
        for _ in 0..10 {
            shared.on_alarm_duty_tick();
            dispatcher.dispatch();
        }
        assert_eq!(dispatcher.duty_count(), 10);
        shared.on_button_falling(Instant::from_millis(0));
        dispatcher.dispatch();
        assert_eq!(dispatcher.duty_count(), 0);

        ring(&shared, &mut dispatcher);
        let mut advances = 0;
        while shared.flags().alarm_active() {
            shared.on_alarm_duty_tick();
            dispatcher.dispatch();
            advances += 1;
        }
        assert_eq!(advances, 60);
    }

    #[test]
    fn test_button_press_silences_ringing_alarm() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        ring(&shared, &mut dispatcher);
        shared.on_alarm_duty_tick();
        dispatcher.dispatch();
        assert!(dispatcher.buzzer().is_on());
        drain(&display);

        shared.on_button_falling(Instant::from_millis(10_000));
        assert_eq!(shared.mailbox().pending(), 1);
        dispatcher.dispatch();

        assert!(!shared.flags().alarm_active());
        assert!(!shared.flags().alarm_armed());
        assert!(!dispatcher.buzzer().is_on());
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::AlarmNotSet);

        // a duty tick already in flight is ignored
        post(&shared, ClockMessage::AlarmFired);
        dispatcher.dispatch();
        assert_eq!(dispatcher.duty_count(), 0);
        assert_eq!(display.try_take(), None);
    }

    #[test]
    fn test_silence_is_idempotent() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        ring(&shared, &mut dispatcher);

        post(&shared, ClockMessage::AlarmSilence);
        post(&shared, ClockMessage::AlarmSilence);
        assert_eq!(dispatcher.dispatch(), 2);

        assert!(!shared.flags().alarm_armed());
        assert!(!shared.flags().alarm_active());
        assert!(!dispatcher.buzzer().is_on());
        assert_eq!(dispatcher.diagnostics().rtc_faults, 0);
    }

    #[test]
    fn test_disarm_while_ringing_clears_both_flags() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        ring(&shared, &mut dispatcher);
        shared.on_alarm_duty_tick();
        dispatcher.dispatch();

        post(&shared, ClockMessage::ApplyAlarm { hour: 7, minute: 0 });
        dispatcher.dispatch();
        assert!(!shared.flags().alarm_armed());
        assert!(!shared.flags().alarm_active());

        // a later interrupt cannot start the alarm again
        shared.on_alarm_fired();
        assert!(!shared.flags().alarm_active());
    }

    #[test]
    fn test_apply_time_while_ringing_silences() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        ring(&shared, &mut dispatcher);
        drain(&display);

        post(&shared, ClockMessage::ApplyTime(TimeOfDay::new(6, 0, 0)));
        dispatcher.dispatch();

        assert!(!shared.flags().alarm_active());
        assert!(!shared.flags().alarm_armed());
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::AlarmNotSet);
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::TimeDate);
    }

    #[test]
    fn test_apply_date_while_ringing_silences() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        ring(&shared, &mut dispatcher);
        shared.on_alarm_duty_tick();
        dispatcher.dispatch();
        assert!(dispatcher.buzzer().is_on());
        drain(&display);

        post(&shared, ClockMessage::ApplyDate(CalendarDate::new(2024, 2, 29)));
        dispatcher.dispatch();

        assert!(!shared.flags().alarm_active());
        assert!(!shared.flags().alarm_armed());
        assert!(!dispatcher.buzzer().is_on());
        assert_eq!(dispatcher.duty_count(), 0);
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::AlarmNotSet);
        let snapshot = display.try_take().unwrap();
        assert_eq!(snapshot.intent, DisplayIntent::TimeDate);
        assert_eq!(snapshot.date.year, 2024);
        assert_eq!(snapshot.date.day, 29);
        assert_eq!(display.try_take(), None);
    }

    #[test]
    fn test_failed_arm_keeps_flag() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        dispatcher.rtc().rtc().reject_writes = true;

        post(&shared, ClockMessage::ApplyAlarm { hour: 7, minute: 0 });
        dispatcher.dispatch();

        assert!(!shared.flags().alarm_armed());
        assert_eq!(dispatcher.diagnostics().rtc_faults, 1);
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::Fault);
        assert_eq!(display.try_take(), None);
    }

    #[test]
    fn test_failed_read_reports_fault() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        dispatcher.rtc().rtc().reject_reads = true;

        shared.on_display_tick();
        post(&shared, ClockMessage::AlarmButtonDisplay);
        assert_eq!(dispatcher.dispatch(), 2);

        assert_eq!(dispatcher.diagnostics().rtc_faults, 2);
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::Fault);
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::Fault);
    }

    #[test]
    fn test_failed_time_write_skips_snapshot() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        ring(&shared, &mut dispatcher);
        drain(&display);
        dispatcher.rtc().rtc().reject_writes = true;

        post(&shared, ClockMessage::ApplyTime(TimeOfDay::new(6, 0, 0)));
        dispatcher.dispatch();

        // the alarm keeps ringing
        assert!(shared.flags().alarm_active());
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::Fault);
        assert_eq!(display.try_take(), None);
    }

    #[test]
    fn test_button_display_shows_alarm_status() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);

        shared.on_button_falling(Instant::from_millis(0));
        dispatcher.dispatch();
        assert_eq!(display.try_take().unwrap().intent, DisplayIntent::AlarmNotSet);

        post(&shared, ClockMessage::ApplyAlarm { hour: 6, minute: 30 });
        dispatcher.dispatch();
        drain(&display);
        shared.on_button_rising(Instant::from_millis(100));
        shared.on_button_falling(Instant::from_millis(1_000));
        dispatcher.dispatch();

        let msg = display.try_take().unwrap();
        assert_eq!(msg.intent, DisplayIntent::AlarmSet);
        assert_eq!((msg.alarm.hour, msg.alarm.minute), (6, 30));
    }

    #[test]
    fn test_dispatch_handles_only_pending_messages() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);
        ring(&shared, &mut dispatcher);

        shared.on_alarm_duty_tick();
        post(&shared, ClockMessage::None);
        assert_eq!(dispatcher.dispatch(), 2);
        // the restarted duty tick has not posted yet
        assert_eq!(dispatcher.dispatch(), 0);
        assert!(shared.duty_kick.signaled());
    }

    #[test]
    fn test_stray_alarm_step_ignored() {
        let shared = ClockShared::new(ClockConfig::new());
        let display = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);

        post(&shared, ClockMessage::AlarmFired);
        dispatcher.dispatch();
        assert_eq!(dispatcher.duty_count(), 0);
        assert!(!dispatcher.buzzer().is_on());
        assert_eq!(display.try_take(), None);
    }

    #[test]
    fn test_full_display_counts_drops() {
        let shared = ClockShared::new(ClockConfig::new());
        let display: DisplayQueue<16> = DisplayQueue::new();
        let mut dispatcher = dispatcher(&shared, &display);

        for _ in 0..4 {
            for _ in 0..5 {
                shared.on_display_tick();
            }
            dispatcher.dispatch();
        }
        assert_eq!(display.pending(), 16);
        assert_eq!(dispatcher.diagnostics().display_dropped, 4);
        assert_eq!(dispatcher.diagnostics().mailbox_dropped, 0);
    }
}
