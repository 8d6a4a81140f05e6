// Board, calibration and motion pattern constants
use std::time::Duration;

// PCA9685 board on the Raspberry Pi I2C header
pub const I2C_BUS: &str = "/dev/i2c-1";
pub const PCA9685_ADDRESS: u8 = 0x40;
pub const CHANNEL_COUNT: u8 = 16;

// Servo calibration (50 Hz frame, 0.75 ms..2.25 ms pulse over 180 degrees)
pub const PWM_FREQUENCY_HZ: u32 = 50;
pub const MIN_PULSE_US: u32 = 750;
pub const MAX_PULSE_US: u32 = 2250;
pub const ACTUATION_RANGE: u16 = 180;

// Enable hardware output (set to false to log commands instead of driving the board)
pub const ACTUATOR_ENABLED: bool = true;

// Single servo sweep
pub const BASIC_CHANNEL: u8 = 0;
pub const BASIC_DELAY: Duration = Duration::from_secs(2);
pub const BASIC_ANGLES: [u16; 4] = [0, 90, 180, 90];

// Two servo patterns, each row is [channel 0 angle, channel 1 angle]
pub const MULTI_CHANNELS: [u8; 2] = [0, 1];
pub const MULTI_DELAY: Duration = Duration::from_secs(3);
pub const MOVEMENT_PATTERNS: [[u16; 2]; 4] = [
    [0, 180],  // opposed
    [45, 135], // diagonal
    [180, 0],  // reversed
    [90, 90],  // both centered
];
