use clap::Parser;
use earpilot::{EarPilotError, ImuSensorSource, InstrumentThread, LogAnnouncer, Settings};
use hiwonder::{HiwonderReader, ImuFrequency};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "read_hiwonder", about = "Run the instrument from a Hiwonder IMU")]
struct Cli {
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Serial port; tries the platform default when omitted
    #[arg(long)]
    port: Option<String>,

    #[arg(long)]
    baud: Option<u32>,

    /// Instrument update rate (Hz)
    #[arg(long, default_value_t = 50.0)]
    rate: f64,
}

fn connect(cli: &Cli) -> Result<HiwonderReader, EarPilotError> {
    let (default_ports, default_baud) = if cfg!(target_os = "linux") {
        (vec!["/dev/ttyUSB0".to_string()], 230400)
    } else if cfg!(target_os = "macos") {
        (vec!["/dev/tty.usbserial-83420".to_string()], 9600)
    } else {
        (Vec::new(), 230400)
    };
    let ports = match &cli.port {
        Some(port) => vec![port.clone()],
        None => default_ports,
    };
    let baud_rate = cli.baud.unwrap_or(default_baud);

    for port in ports {
        match HiwonderReader::new(&port, baud_rate) {
            Ok(reader) => {
                info!("Connected to {} at {} baud", port, baud_rate);
                return Ok(reader);
            }
            Err(e) => error!("Failed to connect to {}: {}", port, e),
        }
    }
    Err(EarPilotError::SourceError(format!(
        "No valid port found on {}",
        std::env::consts::OS
    )))
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
    if !(cli.rate > 0.0 && cli.rate.is_finite()) {
        return Err(EarPilotError::ConfigurationError(format!(
            "Rate {} must be positive",
            cli.rate
        )));
    }

    let reader = connect(&cli)?;
    reader
        .set_frequency(ImuFrequency::Hz200)
        .map_err(|e| EarPilotError::SourceError(format!("Failed to set frequency: {}", e)))?;

    let announcer = LogAnnouncer::new(settings.voice.clone());
    let mut instrument = InstrumentThread::spawn(
        settings,
        ImuSensorSource::new(reader),
        announcer,
        Duration::from_secs_f64(1.0 / cli.rate),
    )?;

    let (key_tx, key_rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if key_tx.send(line.trim().to_lowercase()).is_err() {
                break;
            }
        }
    });
    println!("Enter z to zero, h to zero the heading frame, q to quit");

    'running: loop {
        while let Ok(key) = key_rx.try_recv() {
            match key.as_str() {
                "z" => instrument.zero()?,
                "h" => instrument.zero_heading_frame()?,
                "q" => break 'running,
                "" => {}
                other => println!("Unknown command {:?}", other),
            }
        }

        println!("{}", instrument.state()?);
        thread::sleep(Duration::from_millis(250));
    }

    instrument.stop()
}
