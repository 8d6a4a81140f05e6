// Hardware-free actuator: logs commands and remembers the last angle per channel

use std::collections::BTreeMap;

use tracing::info;

use super::{check_channel, check_channel_count, Actuator, ActuatorError};
use crate::config::ACTUATION_RANGE;
use crate::motion::{Angle, Channel};

#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    channel_count: u8,
    positions: BTreeMap<Channel, Angle>,
}

impl SimulatedActuator {
    pub fn new(channel_count: u8) -> Result<Self, ActuatorError> {
        check_channel_count(channel_count)?;
        info!("Simulated servo board with {} channels", channel_count);
        Ok(Self {
            channel_count,
            positions: BTreeMap::new(),
        })
    }

    /// Last angle commanded on a channel, if any
    pub fn position(&self, channel: Channel) -> Option<Angle> {
        self.positions.get(&channel).copied()
    }

    pub fn positions(&self) -> &BTreeMap<Channel, Angle> {
        &self.positions
    }
}

impl Actuator for SimulatedActuator {
    fn set_angle(&mut self, channel: Channel, angle: Angle) -> Result<(), ActuatorError> {
        check_channel(channel, self.channel_count)?;
        // Same end-stop behavior as the real board
        let angle = Angle(angle.0.min(ACTUATION_RANGE));
        info!("[sim] {} -> {}", channel, angle);
        self.positions.insert(channel, angle);
        Ok(())
    }
}
