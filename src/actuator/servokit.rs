// PCA9685 servo board support
//
// The PCA9685 generates 16 independent 12-bit PWM outputs from a 25 MHz
// oscillator. A hobby servo reads its target from the pulse width within each
// 20 ms frame, so an angle becomes an "off" tick count with "on" fixed at 0.

use std::fmt::Debug;

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;
use pwm_pca9685::{Address, Channel as PwmChannel, Pca9685};
use tracing::{debug, info};

use super::{check_channel, check_channel_count, Actuator, ActuatorError};
use crate::config::{
    ACTUATION_RANGE, MAX_PULSE_US, MIN_PULSE_US, PCA9685_ADDRESS, PWM_FREQUENCY_HZ,
};
use crate::motion::{Angle, Channel};

/// Internal oscillator frequency
const OSCILLATOR_HZ: u32 = 25_000_000;

/// Counter steps per PWM frame (12-bit)
const PWM_STEPS: u32 = 4096;

/// Angle to pulse width mapping for one servo type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCalibration {
    pub frequency_hz: u32,
    pub min_pulse_us: u32,
    pub max_pulse_us: u32,
    pub actuation_range: u16,
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self {
            frequency_hz: PWM_FREQUENCY_HZ,
            min_pulse_us: MIN_PULSE_US,
            max_pulse_us: MAX_PULSE_US,
            actuation_range: ACTUATION_RANGE,
        }
    }
}

impl ServoCalibration {
    /// Prescale register value for the frame frequency: round(osc / (4096 * f)) - 1
    pub fn prescale(&self) -> u8 {
        let divisor = PWM_STEPS * self.frequency_hz;
        let value = (OSCILLATOR_HZ + divisor / 2) / divisor;
        // The chip only accepts 3..=255
        value.saturating_sub(1).clamp(3, 255) as u8
    }

    /// Pulse width for an angle, clamped to the actuation range
    pub fn pulse_width_us(&self, angle: Angle) -> u32 {
        let range = u32::from(self.actuation_range.max(1));
        let degrees = u32::from(angle.0).min(range);
        let span = self.max_pulse_us.saturating_sub(self.min_pulse_us);
        self.min_pulse_us + span * degrees / range
    }

    /// "Off" counter value for an angle with the pulse starting at tick 0
    pub fn off_ticks(&self, angle: Angle) -> u16 {
        let pulse = u64::from(self.pulse_width_us(angle));
        let ticks =
            (pulse * u64::from(PWM_STEPS) * u64::from(self.frequency_hz) + 500_000) / 1_000_000;
        ticks.min(u64::from(PWM_STEPS - 1)) as u16
    }
}

/// Map a board channel to the driver's channel enum
fn pwm_channel(channel: Channel) -> Result<PwmChannel, ActuatorError> {
    let mapped = match channel.0 {
        0 => PwmChannel::C0,
        1 => PwmChannel::C1,
        2 => PwmChannel::C2,
        3 => PwmChannel::C3,
        4 => PwmChannel::C4,
        5 => PwmChannel::C5,
        6 => PwmChannel::C6,
        7 => PwmChannel::C7,
        8 => PwmChannel::C8,
        9 => PwmChannel::C9,
        10 => PwmChannel::C10,
        11 => PwmChannel::C11,
        12 => PwmChannel::C12,
        13 => PwmChannel::C13,
        14 => PwmChannel::C14,
        15 => PwmChannel::C15,
        other => {
            return Err(ActuatorError::ChannelOutOfRange {
                channel: other,
                count: 16,
            })
        }
    };
    Ok(mapped)
}

fn pwm_error<E: Debug>(e: pwm_pca9685::Error<E>) -> ActuatorError {
    ActuatorError::Bus(format!("{:?}", e))
}

/// Servo driver board: one PCA9685 behind one I2C connection
pub struct ServoKit<I2C> {
    pwm: Pca9685<I2C>,
    channel_count: u8,
    calibration: ServoCalibration,
}

impl ServoKit<I2cdev> {
    /// Open the board on a Linux I2C device (e.g. /dev/i2c-1) with default calibration
    pub fn open(bus: &str, channel_count: u8) -> Result<Self, ActuatorError> {
        info!("Opening PCA9685 on {}", bus);
        let i2c = I2cdev::new(bus).map_err(|e| ActuatorError::Bus(format!("{}: {}", bus, e)))?;
        Self::new(i2c, PCA9685_ADDRESS, channel_count, ServoCalibration::default())
    }
}

impl<I2C, E> ServoKit<I2C>
where
    I2C: I2c<Error = E>,
    E: Debug,
{
    /// Initialize the board: set the frame frequency and start the oscillator
    pub fn new(
        i2c: I2C,
        address: u8,
        channel_count: u8,
        calibration: ServoCalibration,
    ) -> Result<Self, ActuatorError> {
        check_channel_count(channel_count)?;

        let mut pwm = Pca9685::new(i2c, Address::from(address)).map_err(pwm_error)?;
        // Prescale can only be written while the oscillator is asleep, which it is after reset
        pwm.set_prescale(calibration.prescale()).map_err(pwm_error)?;
        pwm.enable().map_err(pwm_error)?;

        info!(
            "ServoKit initialized with {} channels at {} Hz (address 0x{:02X})",
            channel_count, calibration.frequency_hz, address
        );
        Ok(Self {
            pwm,
            channel_count,
            calibration,
        })
    }

    pub fn channel_count(&self) -> u8 {
        self.channel_count
    }

    pub fn calibration(&self) -> &ServoCalibration {
        &self.calibration
    }
}

impl<I2C, E> Actuator for ServoKit<I2C>
where
    I2C: I2c<Error = E>,
    E: Debug,
{
    fn set_angle(&mut self, channel: Channel, angle: Angle) -> Result<(), ActuatorError> {
        check_channel(channel, self.channel_count)?;
        let ticks = self.calibration.off_ticks(angle);
        debug!(
            "Set {} to {} ({} us, off tick {})",
            channel,
            angle,
            self.calibration.pulse_width_us(angle),
            ticks
        );
        self.pwm
            .set_channel_on_off(pwm_channel(channel)?, 0, ticks)
            .map_err(pwm_error)
    }
}
