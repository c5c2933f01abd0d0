//! Camera Session CLI
//!
//! Command-line interface for probing camera support and permission and
//! for exercising the stream lifecycle against a real or mock platform.

use camera_session::{
    capture::{FacingMode, FileConfig},
    metrics::{MetricsError, MetricsRegistry, MetricsSnapshot},
    platform::{MediaPlatform, MockBehavior, MockPlatform},
    session::CameraSession,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "camera-session", version, about = "Camera acquisition session tool")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-memory mock platform instead of real cameras.
    #[arg(long, global = true)]
    mock: bool,

    /// Make the mock platform refuse permission.
    #[arg(long, global = true, requires = "mock")]
    deny: bool,

    /// Print the session's Prometheus metrics when the command finishes.
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report capture support and resolve camera permission.
    Probe,
    /// Open a stream, optionally switch cameras, then release it.
    Capture {
        /// Camera to start with (environment or user).
        #[arg(long)]
        facing: Option<FacingMode>,
        /// Switch to the other camera after this many seconds.
        #[arg(long)]
        switch_after: Option<u64>,
        /// Seconds to hold the stream (0 holds until Ctrl-C).
        #[arg(long)]
        hold: Option<u64>,
    },
    /// Print the state of a fresh session as TOML.
    Status,
    /// List attached cameras.
    Devices,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("Camera Session v{}", camera_session::VERSION);

    let mut config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Command::Capture {
        facing: Some(facing),
        ..
    } = &cli.command
    {
        config.session.default_facing = *facing;
    }

    if cli.mock || !cfg!(feature = "camera") {
        info!("Using mock camera platform");
        let fallback = if cli.deny {
            MockBehavior::Deny
        } else {
            MockBehavior::Grant
        };
        let platform = MockPlatform::new()
            .with_fallback(fallback)
            .with_latency(Duration::from_millis(150));
        if let Command::Devices = cli.command {
            print_devices(&platform.list_devices());
            return;
        }
        run(platform, &cli, &config).await;
    } else {
        run_native(&cli, &config).await;
    }
}

#[cfg(feature = "camera")]
async fn run_native(cli: &Cli, config: &FileConfig) {
    let platform = camera_session::NativePlatform::new(config.device.clone());
    if let Command::Devices = cli.command {
        match platform.list_devices() {
            Ok(devices) => print_devices(&devices),
            Err(e) => {
                eprintln!("Failed to list cameras: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }
    run(platform, cli, config).await;
}

#[cfg(not(feature = "camera"))]
async fn run_native(_cli: &Cli, _config: &FileConfig) {
    eprintln!("Built without the camera feature; rerun with --mock");
    std::process::exit(1);
}

fn print_devices(devices: &[String]) {
    if devices.is_empty() {
        println!("No cameras found");
    }
    for (i, name) in devices.iter().enumerate() {
        println!("{i}: {name}");
    }
}

async fn run<P: MediaPlatform>(platform: P, cli: &Cli, config: &FileConfig) {
    let session = CameraSession::new(platform, config.session.clone());
    let reporter = Reporter::start(config.output.metrics_port);

    match &cli.command {
        Command::Probe => {
            println!("Capture supported: {}", session.probe_support());
            match session.request_permission().await {
                Ok(granted) => println!("Permission granted: {granted}"),
                Err(e) => warn!("Permission probe not run: {}", e),
            }
        }
        Command::Capture {
            switch_after, hold, ..
        } => {
            let hold = hold.unwrap_or(config.output.hold_seconds);
            capture(&session, &reporter, *switch_after, hold).await;
        }
        Command::Status => match toml::to_string(&session.state()) {
            Ok(text) => print!("{text}"),
            Err(e) => eprintln!("Failed to encode state: {}", e),
        },
        Command::Devices => unreachable!("devices is answered before a session exists"),
    }

    reporter.report(&session).await;
    if cli.print_metrics {
        print_metrics(&session);
    }
    let stats = session.stats();
    info!(
        acquisitions = stats.acquisitions,
        failures = stats.total_failures(),
        releases = stats.releases,
        "Session finished"
    );
    session.dispose();
}

async fn capture<P: MediaPlatform>(
    session: &CameraSession<P>,
    reporter: &Reporter,
    switch_after: Option<u64>,
    hold_seconds: u64,
) {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    if let Err(e) = session.start_camera().await {
        eprintln!("Failed to start camera: {}", e);
        reporter.report(session).await;
        return;
    }
    if let Some(info) = session.state().stream {
        println!(
            "Streaming {} from the {} camera at {}x{}",
            info.id, info.facing_mode, info.width, info.height
        );
    }
    reporter.report(session).await;

    let started = Instant::now();
    let mut switched = false;
    while !interrupted.load(Ordering::SeqCst) {
        let elapsed = started.elapsed();
        if hold_seconds > 0 && elapsed >= Duration::from_secs(hold_seconds) {
            break;
        }
        if let Some(after) = switch_after {
            if !switched && elapsed >= Duration::from_secs(after) {
                switched = true;
                match session.switch_camera().await {
                    Ok(()) => println!("Switched to the {} camera", session.facing_mode()),
                    Err(e) => {
                        eprintln!("Camera switch failed: {}", e);
                        break;
                    }
                }
                reporter.report(session).await;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    session.stop_camera();
    println!("Camera released");
}

fn print_metrics<P: MediaPlatform>(session: &CameraSession<P>) {
    match render_metrics(session) {
        Ok(text) => print!("{text}"),
        Err(e) => eprintln!("Failed to render metrics: {}", e),
    }
}

fn render_metrics<P: MediaPlatform>(session: &CameraSession<P>) -> Result<String, MetricsError> {
    let registry = MetricsRegistry::new()?;
    registry.update(&MetricsSnapshot::from_session(
        &session.state(),
        &session.stats(),
    ));
    registry.encode()
}

/// Pushes session state to the HTTP exporter when one is running.
struct Reporter {
    #[cfg(feature = "metrics")]
    exporter: Option<SharedMetrics>,
}

#[cfg(feature = "metrics")]
type SharedMetrics = Arc<tokio::sync::RwLock<camera_session::metrics::MetricsState>>;

impl Reporter {
    fn start(port: u16) -> Self {
        if port != 0 && cfg!(not(feature = "metrics")) {
            warn!(port, "Metrics port configured but the metrics feature is disabled");
        }

        Self {
            #[cfg(feature = "metrics")]
            exporter: spawn_exporter(port),
        }
    }

    #[cfg(feature = "metrics")]
    async fn report<P: MediaPlatform>(&self, session: &CameraSession<P>) {
        if let Some(exporter) = &self.exporter {
            let (state, stats) = (session.state(), session.stats());
            exporter.write().await.publish(&state, &stats);
            tracing::debug!(
                streaming = state.is_streaming(),
                permission = ?state.has_permission,
                "Metrics exported"
            );
        }
    }

    #[cfg(not(feature = "metrics"))]
    async fn report<P: MediaPlatform>(&self, _session: &CameraSession<P>) {}
}

#[cfg(feature = "metrics")]
fn spawn_exporter(port: u16) -> Option<SharedMetrics> {
    use camera_session::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return None;
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Metrics exporter disabled: {}", e);
            return None;
        }
    };

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            warn!("Metrics server stopped: {}", e);
        }
    });
    Some(state)
}
