// Sends a real SIGINT to this test process, so it lives in its own test binary.

use std::process::Command;
use std::time::Duration;

use servo_sequencer::actuator::{Actuator, ActuatorError, SimulatedActuator};
use servo_sequencer::config::MOVEMENT_PATTERNS;
use servo_sequencer::demo;
use servo_sequencer::motion::{Angle, Channel, Sequence};
use servo_sequencer::sequencer::{Repeat, RunOutcome};

/// Simulated board that raises Ctrl+C against its own process on the very first command
struct InterruptOnFirstCommand {
    board: SimulatedActuator,
    trace: Vec<(u8, u16)>,
}

impl Actuator for InterruptOnFirstCommand {
    fn set_angle(&mut self, channel: Channel, angle: Angle) -> Result<(), ActuatorError> {
        self.board.set_angle(channel, angle)?;
        self.trace.push((channel.0, angle.0));
        if self.trace.len() == 1 {
            let status = Command::new("kill")
                .arg("-INT")
                .arg(std::process::id().to_string())
                .status()
                .expect("failed to run kill");
            assert!(status.success());
        }
        Ok(())
    }
}

#[tokio::test]
async fn ctrl_c_during_first_pose_still_centers() {
    let shutdown = demo::shutdown_signal().unwrap();
    let mut actuator = InterruptOnFirstCommand {
        board: SimulatedActuator::new(16).unwrap(),
        trace: Vec::new(),
    };
    let sequence = Sequence::from_patterns(&[Channel(0), Channel(1)], &MOVEMENT_PATTERNS);

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        demo::run_sequence(
            &mut actuator,
            sequence,
            Duration::from_millis(200),
            Repeat::Forever,
            shutdown,
        ),
    )
    .await
    .expect("interrupt was never observed")
    .unwrap();

    assert_eq!(outcome, RunOutcome::Interrupted);

    // The process survived the signal: the first pose finished and cleanup ran
    let trace = &actuator.trace;
    assert_eq!(&trace[..2], &[(0u8, 0u16), (1, 180)]);
    assert_eq!(&trace[trace.len() - 2..], &[(0u8, 90u16), (1, 90)]);
    assert_eq!(actuator.board.position(Channel(0)), Some(Angle::CENTER));
    assert_eq!(actuator.board.position(Channel(1)), Some(Angle::CENTER));
}
