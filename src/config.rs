use embassy_time::Duration;

/// Runtime settings of the clock core.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// `AlarmFired` advances before a ringing alarm silences itself
    pub duty_cycle_bound: u32,
    /// Period of the display refresh tick
    pub display_period: Duration,
    /// Delay between buzzer toggles while the alarm rings
    pub duty_period: Duration,
    /// A button press this soon after the previous release is contact bounce
    pub debounce: Duration,
    /// How long the transport task waits for mailbox room
    pub send_timeout: Duration,
}

impl ClockConfig {
    pub const fn new() -> Self {
        Self {
            duty_cycle_bound: 60,
            display_period: Duration::from_secs(1),
            duty_period: Duration::from_secs(1),
            debounce: Duration::from_millis(50),
            send_timeout: Duration::from_millis(10),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::new()
    }
}
