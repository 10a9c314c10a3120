//! The audible alert.

use embedded_hal::digital::OutputPin;

/// An `OutputPin` driving the buzzer, with its last commanded level.
pub struct Buzzer<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Buzzer<P> {
    /// Takes the pin and drives it low.
    pub fn new(mut pin: P) -> Result<Self, P::Error> {
        pin.set_low()?;
        Ok(Self { pin, on: false })
    }

    pub fn release(self) -> P {
        self.pin
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Flips the level. The remembered level only changes if the pin does.
    pub fn toggle(&mut self) -> Result<(), P::Error> {
        if self.on {
            self.pin.set_low()?;
        } else {
            self.pin.set_high()?;
        }
        self.on = !self.on;
        Ok(())
    }

    pub fn off(&mut self) -> Result<(), P::Error> {
        self.pin.set_low()?;
        self.on = false;
        Ok(())
    }
}
