use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Setup logging (set RUST_LOG=debug for per-channel commands)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    if let Err(e) = servo_sequencer::demo::run_multi().await {
        eprintln!("Multi servo demo error: {}", e);
        std::process::exit(1);
    }
}
