use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use emg_session::calibration::{
    CalibrationListener, CalibrationPhase, CalibrationProfile, JsonProfileStore,
};
use emg_session::error::CalibrationError;
use emg_session::transport::{
    address_variants, Effort, EffortControl, SimulatedTransport, SimulationProfile,
};
use emg_session::{AppConfig, ConnectionState, EngineHandle, JsonFileSink};

#[derive(Parser, Debug)]
#[command(name = "emg_cli", about = "EMG sensor session engine harness")]
struct Cli {
    /// JSON config file (defaults to assets/emg_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a full session against the simulated sensor
    Simulate {
        /// Recording length in seconds
        #[arg(long, default_value_t = 10)]
        seconds: u64,
        /// Run the relax/tension calibration before recording
        #[arg(long)]
        calibrate: bool,
        #[arg(long)]
        relax_secs: Option<u64>,
        #[arg(long)]
        tension_secs: Option<u64>,
        /// Load and store the calibration profile here
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Directory for saved sessions (overrides the config)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Seed for the simulated signal
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the address spellings tried on connect
    Variants { address: String },
    /// Connect to the real sensor and print live readings
    #[cfg(feature = "ble")]
    Monitor {
        /// Override the configured device address
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
}

fn main() -> ExitCode {
    emg_session::init_logging();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .map(AppConfig::load_from_file)
        .unwrap_or_else(AppConfig::load);

    match cli.command {
        Commands::Simulate {
            seconds,
            calibrate,
            relax_secs,
            tension_secs,
            profile,
            output,
            seed,
        } => {
            let mut config = config;
            if let Some(secs) = relax_secs {
                config.calibration.relax_secs = secs;
            }
            if let Some(secs) = tension_secs {
                config.calibration.tension_secs = secs;
            }
            if let Some(dir) = output {
                config.session.output_dir = dir.to_string_lossy().into_owned();
            }
            run_simulate(config, seconds, calibrate, profile, seed)
        }
        Commands::Variants { address } => run_variants(&address),
        #[cfg(feature = "ble")]
        Commands::Monitor { address, seconds } => run_monitor(config, address, seconds),
    }
}

/// Listener steering the simulated subject through the protocol
struct PromptListener {
    effort: EffortControl,
    done: mpsc::Sender<Result<CalibrationProfile, CalibrationError>>,
}

impl CalibrationListener for PromptListener {
    fn on_phase_change(&mut self, phase: CalibrationPhase, remaining: Duration) {
        match phase {
            CalibrationPhase::Relax => self.effort.set(Effort::Rest),
            CalibrationPhase::Tension => self.effort.set(Effort::Tense),
            _ => {}
        }
        println!(
            "Calibration: {} for {} s",
            phase.display_name(),
            remaining.as_secs()
        );
    }

    fn on_complete(&mut self, result: Result<CalibrationProfile, CalibrationError>) {
        self.effort.set(Effort::Cycle);
        let _ = self.done.send(result);
    }
}

fn wait_for_connection(engine: &EngineHandle, limit: Duration) -> Result<()> {
    let deadline = Instant::now() + limit;
    loop {
        match engine.current_state() {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::ConnectFailed => bail!("connection attempts exhausted"),
            state if Instant::now() >= deadline => {
                bail!("still {:?} after {:?}", state, limit)
            }
            _ => thread::sleep(Duration::from_millis(100)),
        }
    }
}

fn connect_budget(config: &AppConfig, variants: usize) -> Duration {
    let connection = &config.connection;
    let per_pass = connection.attempt_timeout() * variants.max(1) as u32 + connection.backoff();
    per_pass * connection.max_attempts.max(1) + Duration::from_secs(1)
}

fn run_simulate(
    config: AppConfig,
    seconds: u64,
    calibrate: bool,
    profile_path: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<ExitCode> {
    let simulation = SimulationProfile::default();
    let transport = match seed {
        Some(seed) => SimulatedTransport::with_seed(simulation, seed),
        None => SimulatedTransport::new(simulation),
    };
    let effort = transport.effort_control();
    let store = profile_path.map(JsonProfileStore::new);
    let output_dir = PathBuf::from(&config.session.output_dir);
    let budget = connect_budget(&config, address_variants(&config.device.address).len());

    let engine = EngineHandle::new(config, transport);

    if let Some(store) = &store {
        if let Some(profile) = store.load()? {
            engine.load_calibration(profile)?;
            println!(
                "Loaded calibration: baseline={:.1} max={:.1}",
                profile.baseline, profile.max_value
            );
        }
    }

    println!("Connecting to {} ...", engine.config().device.address);
    engine.connect()?;
    wait_for_connection(&engine, budget)?;
    println!("Connected");

    if calibrate {
        let (done_tx, done_rx) = mpsc::channel();
        engine.start_calibration(PromptListener {
            effort: effort.clone(),
            done: done_tx,
        })?;

        let result = done_rx
            .recv()
            .context("calibration listener dropped without completing")?;
        let profile = result?;
        println!(
            "Calibration complete: baseline={:.1} max={:.1}",
            profile.baseline, profile.max_value
        );
        if let Some(store) = &store {
            store.save(&profile)?;
        }
    }

    let start = engine.start_session()?;
    println!("Recording {} for {} s", start.id(), seconds);

    for _ in 0..seconds {
        thread::sleep(Duration::from_secs(1));
        let snapshot = engine.session_snapshot()?;
        match (engine.last_value(), engine.last_normalized()) {
            (Some(raw), Some(normalized)) => println!(
                "  t={:>3}s samples={:>3} raw={:>6.1} normalized={:>5.1}%",
                snapshot.elapsed_seconds, snapshot.sample_count, raw, normalized
            ),
            _ => println!(
                "  t={:>3}s samples={:>3} (no reading yet)",
                snapshot.elapsed_seconds, snapshot.sample_count
            ),
        }
    }

    let mut sink = JsonFileSink::new(&output_dir);
    let session = engine.save_session(&mut sink)?;
    println!("Saved {}", sink.path_for(&session).display());
    println!("{}", serde_json::to_string_pretty(&session.metrics)?);

    Ok(ExitCode::from(0))
}

fn run_variants(address: &str) -> Result<ExitCode> {
    let variants = address_variants(address);
    if variants.is_empty() {
        bail!("empty address");
    }
    for variant in variants {
        println!("{}", variant);
    }
    Ok(ExitCode::from(0))
}

#[cfg(feature = "ble")]
fn run_monitor(config: AppConfig, address: Option<String>, seconds: u64) -> Result<ExitCode> {
    use emg_session::transport::BtleplugTransport;

    let mut config = config;
    if let Some(address) = address {
        config.device.address = address;
    }

    let transport = BtleplugTransport::new(&config.device.characteristic_uuid)?;
    let budget = connect_budget(&config, address_variants(&config.device.address).len());
    let engine = EngineHandle::new(config, transport);

    println!("Connecting to {} ...", engine.config().device.address);
    engine.connect()?;
    wait_for_connection(&engine, budget)?;
    println!("Connected; reading for {} s", seconds);

    engine.start_reading();
    for _ in 0..seconds {
        thread::sleep(Duration::from_secs(1));
        match engine.last_value() {
            Some(value) => println!("{:.1}", value),
            None => println!("-"),
        }
    }
    engine.stop_reading();

    Ok(ExitCode::from(0))
}
