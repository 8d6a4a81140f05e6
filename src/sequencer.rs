// Timed pose sequencer with guaranteed return to center
//
// Walks a Sequence of poses, holding each one for a fixed delay. The delay is
// the only suspension point and the only place a shutdown request is observed.
// Every channel the sequence uses is driven back to center exactly once,
// whichever way the run ends (completion, shutdown, actuator failure, drop).

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::actuator::{Actuator, ActuatorError};
use crate::motion::{Angle, Channel, MotionState, Sequence};

/// What happens after the last pose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Wrap back to the first pose
    Forever,
    /// Stop after one pass
    Once,
}

/// Sequencer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Pose at this index has been applied
    Stepping(usize),
    Done,
    Cleanup,
    Terminated,
}

/// How a run ended when no error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Interrupted,
}

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("Failed to set {channel} to {angle}: {source}")]
    Command {
        channel: Channel,
        angle: Angle,
        #[source]
        source: ActuatorError,
    },

    #[error("Failed to center {channel}: {source}")]
    Cleanup {
        channel: Channel,
        #[source]
        source: ActuatorError,
    },
}

/// Drives an owned actuator through a pose sequence
pub struct Sequencer<A: Actuator> {
    actuator: A,
    sequence: Sequence,
    channels: Vec<Channel>, // every channel the sequence commands
    delay: Duration,
    repeat: Repeat,
    phase: Phase,
}

impl<A: Actuator> Sequencer<A> {
    pub fn new(actuator: A, sequence: Sequence, delay: Duration, repeat: Repeat) -> Self {
        let channels = sequence.channels();
        Self {
            actuator,
            sequence,
            channels,
            delay,
            repeat,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Channels returned to center by cleanup
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Step through the sequence until it completes (`Repeat::Once`) or `shutdown` resolves.
    ///
    /// Does not center the servos; use [`Sequencer::run_and_center`] for that.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<RunOutcome, SequencerError>
    where
        F: Future<Output = ()>,
    {
        if matches!(self.phase, Phase::Cleanup | Phase::Terminated) {
            warn!("Servos already centered, not restarting the sequence");
            return Ok(RunOutcome::Completed);
        }
        if self.sequence.is_empty() {
            warn!("Empty sequence, nothing to run");
            self.phase = Phase::Done;
            return Ok(RunOutcome::Completed);
        }

        let mut shutdown = std::pin::pin!(shutdown);
        let mut index = 0;

        loop {
            self.phase = Phase::Stepping(index);
            apply_state(&mut self.actuator, index, &self.sequence.states()[index])?;

            // Hold the pose; shutdown wins if both are ready
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping sequence");
                    return Ok(RunOutcome::Interrupted);
                }
                _ = sleep(self.delay) => {}
            }

            index += 1;
            if index == self.sequence.len() {
                match self.repeat {
                    Repeat::Forever => index = 0,
                    Repeat::Once => {
                        info!("All {} patterns applied", self.sequence.len());
                        self.phase = Phase::Done;
                        return Ok(RunOutcome::Completed);
                    }
                }
            }
        }
    }

    /// Center every used channel. Runs at most once; later calls are no-ops.
    ///
    /// All channels are attempted even if one fails. The first failure is returned.
    pub fn cleanup(&mut self) -> Result<(), SequencerError> {
        if self.phase == Phase::Terminated {
            debug!("Servos already centered");
            return Ok(());
        }
        self.phase = Phase::Cleanup;

        info!("Returning {} servo(s) to center", self.channels.len());
        let mut first_error = None;
        for &channel in &self.channels {
            match self.actuator.set_angle(channel, Angle::CENTER) {
                Ok(()) => debug!("  {}: {}", channel, Angle::CENTER),
                Err(source) => {
                    warn!("Failed to center {}: {}", channel, source);
                    first_error.get_or_insert(SequencerError::Cleanup { channel, source });
                }
            }
        }
        self.phase = Phase::Terminated;

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("All servos set to center position");
                Ok(())
            }
        }
    }

    /// Run the sequence, then center the servos no matter how the run ended.
    ///
    /// A run error takes precedence over a cleanup error.
    pub async fn run_and_center<F>(&mut self, shutdown: F) -> Result<RunOutcome, SequencerError>
    where
        F: Future<Output = ()>,
    {
        let outcome = self.run(shutdown).await;
        let centered = self.cleanup();

        match (outcome, centered) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                warn!("Cleanup after failure also failed: {}", cleanup_err);
                Err(e)
            }
        }
    }

    /// Something was commanded and has not been centered yet
    fn needs_centering(&self) -> bool {
        !self.channels.is_empty() && !matches!(self.phase, Phase::Idle | Phase::Terminated)
    }
}

/// Apply one pose, channel by channel in insertion order
fn apply_state<A: Actuator>(
    actuator: &mut A,
    index: usize,
    state: &MotionState,
) -> Result<(), SequencerError> {
    info!("Pattern {}: {}", index + 1, state);
    for (channel, angle) in state.iter() {
        actuator
            .set_angle(channel, angle)
            .map_err(|source| SequencerError::Command {
                channel,
                angle,
                source,
            })?;
        info!("  {}: {}", channel, angle);
    }
    Ok(())
}

impl<A: Actuator> Drop for Sequencer<A> {
    fn drop(&mut self) {
        if !self.needs_centering() {
            return;
        }
        // Run was abandoned (panic, dropped future, early return)
        warn!("Sequencer dropped before cleanup, centering servos");
        if let Err(e) = self.cleanup() {
            warn!("Failed to center servos on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use crate::actuator::SimulatedActuator;

    fn two_servo_sequence() -> Sequence {
        Sequence::from_patterns(&[Channel(0), Channel(1)], &[[0u16, 180], [180, 0]])
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_phases() {
        let sim = SimulatedActuator::new(16).unwrap();
        let mut seq = Sequencer::new(sim, two_servo_sequence(), Duration::from_secs(3), Repeat::Once);
        assert_eq!(seq.phase(), Phase::Idle);
        assert_eq!(seq.channels(), &[Channel(0), Channel(1)]);

        let outcome = seq.run(std::future::pending()).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(seq.phase(), Phase::Done);
        assert_eq!(seq.actuator().position(Channel(0)), Some(Angle(180)));
        assert_eq!(seq.actuator().position(Channel(1)), Some(Angle(0)));

        seq.cleanup().unwrap();
        assert_eq!(seq.phase(), Phase::Terminated);
        assert_eq!(seq.actuator().position(Channel(0)), Some(Angle::CENTER));
        assert_eq!(seq.actuator().position(Channel(1)), Some(Angle::CENTER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_observed_at_delay() {
        let sim = SimulatedActuator::new(16).unwrap();
        let sequence = Sequence::sweep(Channel(0), &[0, 90, 180, 90]);
        let mut seq = Sequencer::new(sim, sequence, Duration::from_secs(2), Repeat::Forever);

        // Poses land at t=0,2,4; shutdown at t=5 falls inside the third hold
        let outcome = seq
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Interrupted);
        assert_eq!(seq.phase(), Phase::Stepping(2));
        assert_eq!(seq.actuator().position(Channel(0)), Some(Angle(180)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_sequence_completes() {
        let sim = SimulatedActuator::new(16).unwrap();
        let mut seq = Sequencer::new(sim, Sequence::default(), Duration::from_secs(2), Repeat::Forever);

        let outcome = seq.run_and_center(std::future::pending()).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(seq.phase(), Phase::Terminated);
        assert!(seq.actuator().positions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_after_cleanup_does_not_move() {
        let sim = SimulatedActuator::new(16).unwrap();
        let sequence = Sequence::new(vec![MotionState::single(Channel(2), Angle(10))]);
        let mut seq = Sequencer::new(sim, sequence, Duration::from_secs(1), Repeat::Once);

        seq.run_and_center(std::future::pending()).await.unwrap();
        assert_eq!(seq.actuator().position(Channel(2)), Some(Angle::CENTER));

        seq.run(std::future::pending()).await.unwrap();
        assert_eq!(seq.actuator().position(Channel(2)), Some(Angle::CENTER));
        assert_eq!(seq.phase(), Phase::Terminated);
    }

    #[test]
    fn test_command_error_message() {
        let err = SequencerError::Command {
            channel: Channel(1),
            angle: Angle(45),
            source: ActuatorError::Bus("nack".to_string()),
        };
        assert_eq!(err.to_string(), "Failed to set ch1 to 45°: I2C bus error: nack");
    }

    #[tokio::test(start_paused = true)]
    async fn test_centering_needed_only_after_commands() {
        let sim = SimulatedActuator::new(16).unwrap();
        let mut empty = Sequencer::new(sim, Sequence::default(), Duration::from_secs(2), Repeat::Once);
        empty.run(std::future::pending()).await.unwrap();
        // Done with nothing commanded: drop has nothing to center
        assert_eq!(empty.phase(), Phase::Done);
        assert!(!empty.needs_centering());

        let sim = SimulatedActuator::new(16).unwrap();
        let sequence = Sequence::sweep(Channel(0), &[0, 180]);
        let mut seq = Sequencer::new(sim, sequence, Duration::from_secs(2), Repeat::Once);
        assert!(!seq.needs_centering());

        seq.run(std::future::pending()).await.unwrap();
        assert!(seq.needs_centering());

        seq.cleanup().unwrap();
        assert!(!seq.needs_centering());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_channel_commands_logged_at_info() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let state = MotionState::new()
            .with(Channel(0), Angle(45))
            .with(Channel(1), Angle(135));
        let mut sim = SimulatedActuator::new(16).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            apply_state(&mut sim, 1, &state).unwrap();
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Pattern 2: [ch0=45°, ch1=135°]"));
        assert!(output.contains("ch0: 45°"));
        assert!(output.contains("ch1: 135°"));
    }
}
