// Servo actuator layer
//
// Provides:
// - The `Actuator` seam the sequencer drives ("set channel C to angle A")
// - PCA9685 board support with servo pulse calibration
// - A simulated actuator for running without hardware

pub mod servokit;
pub mod simulated;

pub use servokit::{ServoCalibration, ServoKit};
pub use simulated::SimulatedActuator;

use crate::motion::{Angle, Channel};

/// Error types for the actuator layer
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("I2C bus error: {0}")]
    Bus(String),

    #[error("Unsupported channel count {0} (expected 8 or 16)")]
    UnsupportedChannelCount(u8),

    #[error("Channel {channel} out of range for a {count}-channel board")]
    ChannelOutOfRange { channel: u8, count: u8 },
}

/// Write-only, synchronous servo output
pub trait Actuator {
    fn set_angle(&mut self, channel: Channel, angle: Angle) -> Result<(), ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn set_angle(&mut self, channel: Channel, angle: Angle) -> Result<(), ActuatorError> {
        (**self).set_angle(channel, angle)
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_angle(&mut self, channel: Channel, angle: Angle) -> Result<(), ActuatorError> {
        (**self).set_angle(channel, angle)
    }
}

/// Boards come in 8 and 16 channel variants
pub(crate) fn check_channel_count(count: u8) -> Result<(), ActuatorError> {
    match count {
        8 | 16 => Ok(()),
        other => Err(ActuatorError::UnsupportedChannelCount(other)),
    }
}

pub(crate) fn check_channel(channel: Channel, count: u8) -> Result<(), ActuatorError> {
    if channel.0 < count {
        Ok(())
    } else {
        Err(ActuatorError::ChannelOutOfRange {
            channel: channel.0,
            count,
        })
    }
}
