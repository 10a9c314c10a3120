//! DS3231 driver behind the [`Rtc`] trait.
//!
//! The device sits on an I2C bus (usually at address 0x68). Time and date are
//! read and written as register blocks so a single transaction sees a
//! consistent snapshot. The clock's alarm uses alarm 2; its interrupt is
//! routed to the INT/SQW pin once [`Config::interrupt_control`] selects
//! [`InterruptControl::Interrupt`].
//!
//! # Example
//!
//! ```rust,ignore
//! use deskclock::ds3231::{Config, Ds3231};
//!
//! let mut rtc = Ds3231::new(i2c, 0x68);
//! rtc.configure(&Config::default())?;
//! let adapter = deskclock::RtcAdapter::new(rtc);
//! ```

use embedded_hal::i2c::I2c;

use crate::alarm::{AlarmDescriptor, AlarmError, RawAlarm};
use crate::datetime::{CalendarDate, DateTimeError, RawDate, RawTime, TimeOfDay};
use crate::registers::{
    Control, InterruptControl, Oscillator, RegAddr, SquareWaveFrequency, Status,
    TimeRepresentation,
};
use crate::rtc::Rtc;

/// Default I2C address of the DS3231.
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Bring-up configuration for the device.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub time_representation: TimeRepresentation,
    pub square_wave_frequency: SquareWaveFrequency,
    pub interrupt_control: InterruptControl,
    pub battery_backed_square_wave: bool,
    pub oscillator_enable: Oscillator,
}

impl Default for Config {
    /// 24-hour mode with the INT/SQW pin driven by the alarms.
    fn default() -> Self {
        Self {
            time_representation: TimeRepresentation::TwentyFourHour,
            square_wave_frequency: SquareWaveFrequency::Hz1,
            interrupt_control: InterruptControl::Interrupt,
            battery_backed_square_wave: false,
            oscillator_enable: Oscillator::Enabled,
        }
    }
}

/// Errors from the DS3231 driver.
#[derive(Debug)]
pub enum Ds3231Error<E> {
    /// The bus transaction failed
    I2c(E),
    /// A time or date value cannot be represented, or a register is corrupt
    DateTime(DateTimeError),
    /// An alarm value cannot be represented, or the alarm registers are corrupt
    Alarm(AlarmError),
}

impl<E> From<E> for Ds3231Error<E> {
    fn from(e: E) -> Self {
        Ds3231Error::I2c(e)
    }
}

// Single-register read and write accessors.
macro_rules! register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+ $(,)?) => {
        $(
            paste::paste! {
                pub fn [< set_ $name >](&mut self, value: $typ) -> Result<(), Ds3231Error<I2C::Error>> {
                    self.i2c.write(self.address, &[$regaddr as u8, value.into()])?;
                    Ok(())
                }
            }

            pub fn $name(&mut self) -> Result<$typ, Ds3231Error<I2C::Error>> {
                let mut data = [0];
                self.i2c.write_read(self.address, &[$regaddr as u8], &mut data)?;
                Ok(<$typ>::from(data[0]))
            }
        )+
    };
}

/// DS3231 real-time clock.
pub struct Ds3231<I2C: I2c> {
    i2c: I2C,
    address: u8,
    time_representation: TimeRepresentation,
}

impl<I2C: I2c> Ds3231<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            time_representation: TimeRepresentation::TwentyFourHour,
        }
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Applies `config` to the control register and the hour format.
    ///
    /// Alarm interrupt enables are left as they are so a reboot does not
    /// disarm an alarm that survived on battery power.
    pub fn configure(&mut self, config: &Config) -> Result<(), Ds3231Error<I2C::Error>> {
        let mut control = self.control()?;
        control.set_oscillator_enable(config.oscillator_enable);
        control.set_battery_backed_square_wave(config.battery_backed_square_wave);
        control.set_square_wave_frequency(config.square_wave_frequency);
        control.set_interrupt_control(config.interrupt_control);
        debug!("ds3231: control={:?}", control);
        self.set_control(control)?;

        let time = self.time()?;
        self.time_representation = config.time_representation;
        self.set_time(&time)?;
        Ok(())
    }

    /// `true` if the oscillator stopped at some point, meaning the time is
    /// not trustworthy until it is set again.
    pub fn oscillator_stopped(&mut self) -> Result<bool, Ds3231Error<I2C::Error>> {
        Ok(self.status()?.oscillator_stop_flag())
    }

    register_access!(
        (control, RegAddr::Control, Control),
        (status, RegAddr::ControlStatus, Status),
    );

    fn read_block<const N: usize>(
        &mut self,
        start: RegAddr,
    ) -> Result<[u8; N], Ds3231Error<I2C::Error>> {
        let mut data = [0; N];
        self.i2c.write_read(self.address, &[start as u8], &mut data)?;
        Ok(data)
    }

    fn clear_alarm2_flag(&mut self) -> Result<(), Ds3231Error<I2C::Error>> {
        let mut status = self.status()?;
        status.set_alarm2_flag(false);
        self.set_status(status)
    }
}

impl<I2C: I2c> Rtc for Ds3231<I2C> {
    type Error = Ds3231Error<I2C::Error>;

    fn time(&mut self) -> Result<TimeOfDay, Self::Error> {
        let data: [u8; 3] = self.read_block(RegAddr::Seconds)?;
        RawTime::from(data).into_time().map_err(Ds3231Error::DateTime)
    }

    fn date(&mut self) -> Result<CalendarDate, Self::Error> {
        let data: [u8; 4] = self.read_block(RegAddr::Day)?;
        RawDate::from(data).into_date().map_err(Ds3231Error::DateTime)
    }

    fn alarm(&mut self) -> Result<AlarmDescriptor, Self::Error> {
        if !self.control()?.alarm2_interrupt_enable() {
            // Never-programmed registers power up as zeros, which is not a
            // valid alarm. A disabled alarm reads back zero-valued.
            return Ok(AlarmDescriptor::default());
        }
        let data: [u8; 3] = self.read_block(RegAddr::Alarm2Minutes)?;
        RawAlarm::from(data)
            .into_descriptor(true)
            .map_err(Ds3231Error::Alarm)
    }

    fn set_time(&mut self, time: &TimeOfDay) -> Result<(), Self::Error> {
        let raw =
            RawTime::from_time(time, self.time_representation).map_err(Ds3231Error::DateTime)?;
        let data: [u8; 3] = (&raw).into();
        // Writing the seconds register resets the countdown chain, so the
        // new second starts whole.
        self.i2c.write(
            self.address,
            &[RegAddr::Seconds as u8, data[0], data[1], data[2]],
        )?;
        Ok(())
    }

    fn set_date(&mut self, date: &CalendarDate) -> Result<(), Self::Error> {
        let raw = RawDate::from_date(date).map_err(Ds3231Error::DateTime)?;
        let data: [u8; 4] = (&raw).into();
        self.i2c.write(
            self.address,
            &[RegAddr::Day as u8, data[0], data[1], data[2], data[3]],
        )?;
        Ok(())
    }

    fn set_alarm(&mut self, alarm: &AlarmDescriptor) -> Result<(), Self::Error> {
        let raw = RawAlarm::from_descriptor(alarm).map_err(Ds3231Error::Alarm)?;
        let data: [u8; 3] = (&raw).into();
        self.i2c.write(
            self.address,
            &[RegAddr::Alarm2Minutes as u8, data[0], data[1], data[2]],
        )?;
        // A flag left over from an earlier match would assert INT at once.
        self.clear_alarm2_flag()?;
        let mut control = self.control()?;
        control.set_interrupt_control(InterruptControl::Interrupt);
        control.set_alarm2_interrupt_enable(alarm.enabled);
        self.set_control(control)
    }

    fn clear_alarm(&mut self) -> Result<(), Self::Error> {
        let mut control = self.control()?;
        control.set_alarm2_interrupt_enable(false);
        self.set_control(control)?;
        self.clear_alarm2_flag()
    }

    fn acknowledge_alarm(&mut self) -> Result<(), Self::Error> {
        self.clear_alarm2_flag()
    }
}
