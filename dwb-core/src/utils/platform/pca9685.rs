//! PCA9685-backed drive actuator.
//!
//! Each wheel uses a pair of PWM channels on the expander: a phase channel
//! selecting direction (full on = reverse) and an enable channel carrying the
//! duty cycle. The expander sits on the I2C bus and may share it with other
//! devices through `RefCellDevice`.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use super::{clamp_percent, DriveActuator, MAX_PERCENT};

/// Default I2C address of the motor expander.
pub const DEFAULT_ADDRESS: u8 = 0x55;

/// Full-scale PWM count.
const MAX_DUTY: u16 = 4095;

/// Errors raised while setting up or writing the PWM expander.
#[derive(Debug)]
pub enum DriveError<E: core::fmt::Debug> {
    PwmError(PwmError<E>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    Left,
    Right,
}

/// Two-wheel drive over a PCA9685.
pub struct Pca9685Drive<DEV> {
    pwm: Pca9685<DEV>,
    /// (phase, enable) channel per wheel
    left: (Channel, Channel),
    right: (Channel, Channel),
    invert_right: bool,
    faults: u32,
}

impl<'a, I2C, E> Pca9685Drive<RefCellDevice<'a, I2C>>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
{
    /// Attach to an expander on a bus shared with other devices.
    pub fn on_shared_bus(
        i2c_bus: &'a RefCell<I2C>,
        address: Option<u8>,
    ) -> Result<Self, DriveError<E>> {
        Self::new(
            RefCellDevice::new(i2c_bus),
            address.unwrap_or(DEFAULT_ADDRESS),
        )
    }
}

impl<DEV, E> Pca9685Drive<DEV>
where
    DEV: I2c<Error = E>,
    E: core::fmt::Debug,
{
    /// Wrap the expander at `address`. Left wheel on C0/C1, right on C2/C3.
    pub fn new(
        dev: DEV,
        address: u8,
    ) -> Result<Self, DriveError<E>> {
        let pwm = Pca9685::new(dev, PwmAddress::from(address)).map_err(DriveError::PwmError)?;
        Ok(Self {
            pwm,
            left: (Channel::C0, Channel::C1),
            right: (Channel::C2, Channel::C3),
            invert_right: false,
            faults: 0,
        })
    }

    /// Override the (phase, enable) channel pairs.
    pub fn with_channels(
        mut self,
        left: (Channel, Channel),
        right: (Channel, Channel),
    ) -> Self {
        self.left = left;
        self.right = right;
        self
    }

    /// Flip the right wheel's direction for a mirror-mounted motor.
    pub fn with_inverted_right(
        mut self,
        invert: bool,
    ) -> Self {
        self.invert_right = invert;
        self
    }

    /// Wake the expander and set the prescaler (100, about 60Hz).
    pub fn configure(&mut self) -> Result<(), DriveError<E>> {
        self.pwm.enable().map_err(DriveError::PwmError)?;
        tracing::info!("PWM enabled");
        self.pwm.set_prescale(100).map_err(DriveError::PwmError)?;
        tracing::info!("PWM prescale set to 60Hz");
        Ok(())
    }

    /// Drive one wheel at `percent`, clamped into `[-100, 100]`.
    pub fn set_wheel(
        &mut self,
        wheel: Wheel,
        percent: f32,
    ) -> Result<(), DriveError<E>> {
        let (channels, sign) = match wheel {
            Wheel::Left => (self.left, 1.0),
            Wheel::Right => (self.right, if self.invert_right { -1.0 } else { 1.0 }),
        };
        let pct = clamp_percent(percent) * sign;
        let duty = libm::fabsf(pct) / MAX_PERCENT;
        let forward = pct >= 0.0;
        let (phase_channel, enable_channel) = channels;

        self.pwm
            .set_channel_on_off(phase_channel, 0, if forward { 0 } else { MAX_DUTY })
            .map_err(DriveError::PwmError)?;
        self.pwm
            .set_channel_on_off(enable_channel, 0, (duty * MAX_DUTY as f32) as u16)
            .map_err(DriveError::PwmError)?;
        Ok(())
    }

    /// Number of failed wheel writes since construction.
    pub fn faults(&self) -> u32 {
        self.faults
    }

    fn write_logged(
        &mut self,
        wheel: Wheel,
        percent: f32,
    ) {
        if let Err(e) = self.set_wheel(wheel, percent) {
            self.faults = self.faults.saturating_add(1);
            tracing::error!(?wheel, percent, "PWM write failed: {:?}", e);
        }
    }
}

impl<DEV, E> DriveActuator for Pca9685Drive<DEV>
where
    DEV: I2c<Error = E>,
    E: core::fmt::Debug,
{
    fn set_left(
        &mut self,
        percent: f32,
    ) {
        self.write_logged(Wheel::Left, percent);
    }

    fn set_right(
        &mut self,
        percent: f32,
    ) {
        self.write_logged(Wheel::Right, percent);
    }
}
