use clap::Parser;
use earpilot::{EarPilotError, Instrument, LogAnnouncer, Maneuver, ScriptedSource, Settings};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

//* run with `cargo run --bin earpilot-sim -- --maneuver left-turn` */

#[derive(Parser, Debug)]
#[command(name = "earpilot-sim", about = "Fly a scripted maneuver and log the callouts")]
struct Cli {
    /// JSON settings file; defaults are used when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Maneuver::LeftTurn)]
    maneuver: Maneuver,

    /// Seconds to fly
    #[arg(long, default_value_t = 20.0)]
    duration: f64,

    /// Sample rate (Hz)
    #[arg(long, default_value_t = 30.0)]
    rate: f64,

    /// Re-zero attitude at this many seconds in
    #[arg(long)]
    zero_at: Option<f64>,

    /// Pace steps against the wall clock instead of running flat out
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

fn main() -> Result<(), EarPilotError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if !(cli.duration >= 0.0 && cli.duration.is_finite()) {
        return Err(EarPilotError::ConfigurationError(format!(
            "Duration {} must be non-negative",
            cli.duration
        )));
    }

    let source = ScriptedSource::new(cli.maneuver, cli.rate)?;
    let announcer = LogAnnouncer::new(settings.voice.clone());
    let mut instrument = Instrument::new(settings, source, announcer)?;
    info!("Flying {} for {:.1}s at {:.0} Hz", cli.maneuver, cli.duration, cli.rate);

    let period = Duration::from_secs_f64(1.0 / cli.rate);
    let steps = (cli.duration * cli.rate).ceil() as u64;
    let report_every = (cli.rate.round() as u64).max(1);
    let mut zero_pending = cli.zero_at;
    let mut next_time = Instant::now() + period;

    for step in 0..steps {
        let now = step as f64 / cli.rate;
        if zero_pending.is_some_and(|at| now >= at) {
            info!("Zeroing at {:.1}s", now);
            instrument.zero();
            zero_pending = None;
        }

        let state = instrument.step(now);
        if step % report_every == 0 {
            info!("t={:5.1}s {}", now, state);
        }

        if cli.realtime {
            let wall = Instant::now();
            if next_time > wall {
                thread::sleep(next_time - wall);
            } else {
                warn!("Missed step deadline by {:?}", wall - next_time);
            }
            next_time += period;
        }
    }

    instrument.stop()?;
    info!(
        "Done: {} spoken callouts, {} tones",
        instrument.announcer().spoken(),
        instrument.announcer().tones()
    );
    Ok(())
}
