//! DS3231 register map.
//!
//! Only the registers the clock core touches are modelled: the seven
//! timekeeping registers, the three alarm 2 registers, and the control and
//! status registers. Every register is a `bitfield` newtype over its raw
//! byte so that BCD nibbles and flag bits are addressed by name.

use bitfield::bitfield;

/// Start addresses of the register blocks the driver reads and writes.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register, start of the seconds/minutes/hours block
    Seconds = 0x00,
    /// Day of week register, start of the day/date/month/year block
    Day = 0x03,
    /// Alarm 2 minutes register, start of the alarm 2 block
    Alarm2Minutes = 0x0B,
    /// Control register
    Control = 0x0E,
    /// Control/status register
    ControlStatus = 0x0F,
}

/// Hour register format.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeRepresentation {
    /// 24-hour format (0-23)
    TwentyFourHour = 0,
    /// 12-hour format (1-12 + AM/PM)
    TwelveHour = 1,
}

impl From<u8> for TimeRepresentation {
    fn from(v: u8) -> Self {
        match v {
            0 => TimeRepresentation::TwentyFourHour,
            _ => TimeRepresentation::TwelveHour,
        }
    }
}

impl From<TimeRepresentation> for u8 {
    fn from(v: TimeRepresentation) -> Self {
        v as u8
    }
}

/// Oscillator state as seen by the EOSC bit (active low).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oscillator {
    /// Oscillator runs on battery power
    Enabled = 0,
    /// Oscillator stops when running on battery power
    Disabled = 1,
}

impl From<u8> for Oscillator {
    fn from(v: u8) -> Self {
        match v {
            0 => Oscillator::Enabled,
            _ => Oscillator::Disabled,
        }
    }
}

impl From<Oscillator> for u8 {
    fn from(v: Oscillator) -> Self {
        v as u8
    }
}

/// INT/SQW pin function (INTCN bit).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptControl {
    /// Pin outputs the square wave
    SquareWave = 0,
    /// Pin is asserted low on an enabled alarm match
    Interrupt = 1,
}

impl From<u8> for InterruptControl {
    fn from(v: u8) -> Self {
        match v {
            0 => InterruptControl::SquareWave,
            _ => InterruptControl::Interrupt,
        }
    }
}

impl From<InterruptControl> for u8 {
    fn from(v: InterruptControl) -> Self {
        v as u8
    }
}

/// Square wave output frequency (RS2:RS1).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWaveFrequency {
    /// 1 Hz
    Hz1 = 0b00,
    /// 1.024 kHz
    Hz1024 = 0b01,
    /// 4.096 kHz
    Hz4096 = 0b10,
    /// 8.192 kHz
    Hz8192 = 0b11,
}

impl From<u8> for SquareWaveFrequency {
    fn from(v: u8) -> Self {
        match v & 0b11 {
            0b00 => SquareWaveFrequency::Hz1,
            0b01 => SquareWaveFrequency::Hz1024,
            0b10 => SquareWaveFrequency::Hz4096,
            _ => SquareWaveFrequency::Hz8192,
        }
    }
}

impl From<SquareWaveFrequency> for u8 {
    fn from(v: SquareWaveFrequency) -> Self {
        v as u8
    }
}

/// DY/DT bit of the alarm day/date register.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DayDateSelect {
    /// Compare against the date of month (1-31)
    Date = 0,
    /// Compare against the day of week (1-7)
    Day = 1,
}

impl From<u8> for DayDateSelect {
    fn from(v: u8) -> Self {
        match v {
            0 => DayDateSelect::Date,
            _ => DayDateSelect::Day,
        }
    }
}

impl From<DayDateSelect> for u8 {
    fn from(v: DayDateSelect) -> Self {
        v as u8
    }
}

// Conversions to and from the raw byte, plus a defmt impl that prints the
// bits, for every register newtype.
macro_rules! register_u8 {
    ($($typ:ident),+ $(,)?) => {
        $(
            impl From<u8> for $typ {
                fn from(v: u8) -> Self {
                    paste::paste!([< $typ >](v))
                }
            }

            impl From<$typ> for u8 {
                fn from(v: $typ) -> Self {
                    v.0
                }
            }

            #[cfg(feature = "defmt")]
            impl defmt::Format for $typ {
                fn format(&self, f: defmt::Formatter) {
                    defmt::write!(f, "{}({=u8:#x})", stringify!($typ), self.0);
                }
            }
        )+
    };
}

bitfield! {
    /// Seconds register, BCD.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    pub ten_seconds, set_ten_seconds: 6, 4;
    pub seconds, set_seconds: 3, 0;
}

bitfield! {
    /// Minutes register, BCD.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Minutes(u8);
    impl Debug;
    pub ten_minutes, set_ten_minutes: 6, 4;
    pub minutes, set_minutes: 3, 0;
}

bitfield! {
    /// Hours register with 12/24 selection, BCD.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    pub from into TimeRepresentation, time_representation, set_time_representation: 6, 6;
    /// PM flag in 12-hour mode, 20-hour bit in 24-hour mode
    pub pm_or_twenty_hours, set_pm_or_twenty_hours: 5, 5;
    pub ten_hours, set_ten_hours: 4, 4;
    pub hours, set_hours: 3, 0;
}

bitfield! {
    /// Day of week register (1-7).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Day(u8);
    impl Debug;
    pub day, set_day: 2, 0;
}

bitfield! {
    /// Date of month register, BCD.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Date(u8);
    impl Debug;
    pub ten_date, set_ten_date: 5, 4;
    pub date, set_date: 3, 0;
}

bitfield! {
    /// Month register with the century bit, BCD.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Month(u8);
    impl Debug;
    /// Set when the year register has rolled past 99
    pub century, set_century: 7;
    pub ten_month, set_ten_month: 4, 4;
    pub month, set_month: 3, 0;
}

bitfield! {
    /// Year register (0-99), BCD.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Year(u8);
    impl Debug;
    pub ten_year, set_ten_year: 7, 4;
    pub year, set_year: 3, 0;
}

bitfield! {
    /// Alarm 2 minutes register with the A2M2 mask bit.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmMinutes(u8);
    impl Debug;
    pub mask, set_mask: 7;
    pub ten_minutes, set_ten_minutes: 6, 4;
    pub minutes, set_minutes: 3, 0;
}

bitfield! {
    /// Alarm 2 hours register with the A2M3 mask bit.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmHours(u8);
    impl Debug;
    pub mask, set_mask: 7;
    pub from into TimeRepresentation, time_representation, set_time_representation: 6, 6;
    pub pm_or_twenty_hours, set_pm_or_twenty_hours: 5, 5;
    pub ten_hours, set_ten_hours: 4, 4;
    pub hours, set_hours: 3, 0;
}

bitfield! {
    /// Alarm 2 day/date register with the A2M4 mask bit and DY/DT select.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmDayDate(u8);
    impl Debug;
    pub mask, set_mask: 7;
    pub from into DayDateSelect, day_date_select, set_day_date_select: 6, 6;
    pub ten_date, set_ten_date: 5, 4;
    /// Day of week when DY/DT is set, ones digit of the date otherwise
    pub day_or_date, set_day_or_date: 3, 0;
}

bitfield! {
    /// Control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control(u8);
    impl Debug;
    pub from into Oscillator, oscillator_enable, set_oscillator_enable: 7, 7;
    pub battery_backed_square_wave, set_battery_backed_square_wave: 6;
    pub from into SquareWaveFrequency, square_wave_frequency, set_square_wave_frequency: 4, 3;
    pub from into InterruptControl, interrupt_control, set_interrupt_control: 2, 2;
    pub alarm2_interrupt_enable, set_alarm2_interrupt_enable: 1;
}

bitfield! {
    /// Control/status register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Status(u8);
    impl Debug;
    pub oscillator_stop_flag, set_oscillator_stop_flag: 7;
    pub alarm2_flag, set_alarm2_flag: 1;
}

register_u8!(
    Seconds,
    Minutes,
    Hours,
    Day,
    Date,
    Month,
    Year,
    AlarmMinutes,
    AlarmHours,
    AlarmDayDate,
    Control,
    Status,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timekeeping_nibbles() {
        let seconds = Seconds::from(0x59);
        assert_eq!(seconds.ten_seconds(), 5);
        assert_eq!(seconds.seconds(), 9);

        let hours = Hours::from(0x23);
        assert_eq!(hours.time_representation(), TimeRepresentation::TwentyFourHour);
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.ten_hours(), 0);
        assert_eq!(hours.hours(), 3);

        let mut month = Month::default();
        month.set_century(true);
        month.set_ten_month(1);
        month.set_month(2);
        assert_eq!(u8::from(month), 0x92);
    }

    #[test]
    fn test_alarm_registers() {
        let mut minutes = AlarmMinutes::default();
        minutes.set_mask(true);
        minutes.set_ten_minutes(3);
        assert_eq!(u8::from(minutes), 0xB0);

        let day_date = AlarmDayDate::from(0xC5);
        assert!(day_date.mask());
        assert_eq!(day_date.day_date_select(), DayDateSelect::Day);
        assert_eq!(day_date.day_or_date(), 5);
    }

    #[test]
    fn test_control_and_status_bits() {
        let mut control = Control::default();
        control.set_interrupt_control(InterruptControl::Interrupt);
        control.set_alarm2_interrupt_enable(true);
        assert_eq!(u8::from(control), 0b0000_0110);
        assert_eq!(control.oscillator_enable(), Oscillator::Enabled);
        assert_eq!(control.square_wave_frequency(), SquareWaveFrequency::Hz1);

        // bits outside the modelled fields survive a flag update
        let mut status = Status::from(0b1000_1011);
        assert!(status.oscillator_stop_flag());
        assert!(status.alarm2_flag());
        status.set_alarm2_flag(false);
        assert_eq!(u8::from(status), 0b1000_1001);
    }

    #[test]
    fn test_enum_conversions_never_panic() {
        for v in 0..=u8::MAX {
            let _ = TimeRepresentation::from(v);
            let _ = Oscillator::from(v);
            let _ = InterruptControl::from(v);
            let _ = SquareWaveFrequency::from(v);
            let _ = DayDateSelect::from(v);
        }
        assert_eq!(SquareWaveFrequency::from(0b10), SquareWaveFrequency::Hz4096);
        assert_eq!(u8::from(DayDateSelect::Day), 1);
    }
}
