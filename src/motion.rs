// Motion data model: channels, angles, poses and pose sequences

use std::fmt;

/// PWM output on the driver board, one servo per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(pub u8);

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Commanded servo position in degrees (nominally 0..=180, not validated here)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Angle(pub u16);

impl Angle {
    /// Safe resting position every used channel returns to on exit
    pub const CENTER: Angle = Angle(90);
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// One simultaneous target pose: channel -> angle, applied in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionState {
    targets: Vec<(Channel, Angle)>,
}

impl MotionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(channel: Channel, angle: Angle) -> Self {
        Self::new().with(channel, angle)
    }

    /// Set a channel's target, replacing it in place if already present
    pub fn with(mut self, channel: Channel, angle: Angle) -> Self {
        match self.targets.iter_mut().find(|(c, _)| *c == channel) {
            Some(target) => target.1 = angle,
            None => self.targets.push((channel, angle)),
        }
        self
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Channel, Angle)>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |state, (channel, angle)| state.with(channel, angle))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, Angle)> + '_ {
        self.targets.iter().copied()
    }

    pub fn angle_for(&self, channel: Channel) -> Option<Angle> {
        self.targets
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|&(_, angle)| angle)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (channel, angle)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", channel, angle)?;
        }
        write!(f, "]")
    }
}

/// Ordered list of poses walked by the sequencer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    states: Vec<MotionState>,
}

impl Sequence {
    pub fn new(states: Vec<MotionState>) -> Self {
        Self { states }
    }

    /// One single-channel pose per angle
    pub fn sweep(channel: Channel, angles: &[u16]) -> Self {
        Self::new(
            angles
                .iter()
                .map(|&a| MotionState::single(channel, Angle(a)))
                .collect(),
        )
    }

    /// Build poses from pattern rows, pairing each row with `channels` position by position.
    /// Rows and channel lists of different lengths are truncated to the shorter one.
    pub fn from_patterns<P: AsRef<[u16]>>(channels: &[Channel], patterns: &[P]) -> Self {
        Self::new(
            patterns
                .iter()
                .map(|row| {
                    MotionState::from_pairs(
                        channels
                            .iter()
                            .copied()
                            .zip(row.as_ref().iter().map(|&a| Angle(a))),
                    )
                })
                .collect(),
        )
    }

    /// Every channel commanded by any pose, deduplicated, in first-appearance order
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = Vec::new();
        for (channel, _) in self.states.iter().flat_map(|state| state.iter()) {
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        channels
    }

    pub fn states(&self) -> &[MotionState] {
        &self.states
    }

    pub fn get(&self, index: usize) -> Option<&MotionState> {
        self.states.get(index)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
