// Servo demos: single servo sweep and two servo pattern run
//
// Both demos own one actuator for the whole process, hand it to a Sequencer,
// and stop on Ctrl+C. The interrupt handler is installed before the board is
// opened, so no command is ever issued while SIGINT would still kill the
// process. Servos are centered on every exit path.

use std::error::Error;
use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use crate::actuator::{Actuator, ServoKit, SimulatedActuator};
use crate::config::{
    ACTUATOR_ENABLED, BASIC_ANGLES, BASIC_CHANNEL, BASIC_DELAY, CHANNEL_COUNT, I2C_BUS,
    MOVEMENT_PATTERNS, MULTI_CHANNELS, MULTI_DELAY,
};
use crate::motion::{Channel, Sequence};
use crate::sequencer::{Repeat, RunOutcome, Sequencer};

pub type DemoResult<T = ()> = Result<T, Box<dyn Error + Send + Sync>>;

/// Open the PCA9685 board, or the simulator when hardware output is disabled
fn open_actuator(hardware: bool) -> DemoResult<Box<dyn Actuator>> {
    if hardware {
        Ok(Box::new(ServoKit::open(I2C_BUS, CHANNEL_COUNT)?))
    } else {
        warn!("Hardware output disabled, simulating servo board");
        Ok(Box::new(SimulatedActuator::new(CHANNEL_COUNT)?))
    }
}

/// Install the SIGINT handler now and return a future that resolves on the first Ctrl+C.
///
/// Must be called before any servo is commanded.
pub fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    Ok(async move {
        if interrupt.recv().await.is_none() {
            warn!("Interrupt signal stream closed, running until completion");
            std::future::pending::<()>().await;
        }
    })
}

/// Sweep one servo 0 -> 90 -> 180 -> 90 forever, until Ctrl+C
pub async fn run_basic() -> DemoResult {
    let shutdown = shutdown_signal()?;
    let actuator = open_actuator(ACTUATOR_ENABLED)?;
    let sequence = Sequence::sweep(Channel(BASIC_CHANNEL), &BASIC_ANGLES);

    info!(
        "Sweeping servo on channel {} every {}s (Ctrl+C to stop)",
        BASIC_CHANNEL,
        BASIC_DELAY.as_secs()
    );
    run_sequence(actuator, sequence, BASIC_DELAY, Repeat::Forever, shutdown).await?;
    Ok(())
}

/// Drive two servos through the movement patterns once
pub async fn run_multi() -> DemoResult {
    info!("Two servo synchronized control");
    let shutdown = shutdown_signal()?;
    let actuator = open_actuator(ACTUATOR_ENABLED)?;

    let channels: Vec<Channel> = MULTI_CHANNELS.iter().copied().map(Channel).collect();
    let sequence = Sequence::from_patterns(&channels, &MOVEMENT_PATTERNS);

    info!(
        "Controlling servos on channels {}",
        MULTI_CHANNELS.map(|c| c.to_string()).join(", ")
    );
    run_sequence(actuator, sequence, MULTI_DELAY, Repeat::Once, shutdown).await?;
    Ok(())
}

/// Run and center. Completion and interrupt are both success; only errors fail the demo.
pub async fn run_sequence<A, F>(
    actuator: A,
    sequence: Sequence,
    delay: Duration,
    repeat: Repeat,
    shutdown: F,
) -> DemoResult<RunOutcome>
where
    A: Actuator,
    F: Future<Output = ()>,
{
    let mut sequencer = Sequencer::new(actuator, sequence, delay, repeat);

    let outcome = sequencer.run_and_center(shutdown).await?;
    match outcome {
        RunOutcome::Completed => info!("Demo finished"),
        RunOutcome::Interrupted => info!("Exiting program"),
    }
    Ok(outcome)
}
