use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use capdac_logger::logging::init_logging_with;
use capdac_logger::persist::{self, DEFAULT_DATA_DIR, DEFAULT_FILE_STEM};
use capdac_logger::session::{DEFAULT_DURATION_S, DEFAULT_SAMPLING_RATE_HZ};
use capdac_logger::transport::{BAUD_RATE, DEFAULT_READ_TIMEOUT};
use capdac_logger::{
    AcquisitionSession, SerialSettings, SerialTransport, SessionConfig, ThreadPacer,
};

#[derive(Parser, Debug)]
#[command(
    name = "capdac-logger",
    about = "Acquire capacitance readings from the sensor board and save them as CSV"
)]
struct Args {
    /// Serial port of the board (e.g., /dev/ttyUSB0 or COM3)
    #[arg(short, long)]
    port: String,
    /// Serial baud rate
    #[arg(long, default_value_t = BAUD_RATE)]
    baud: u32,
    /// Per-read serial timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,
    /// Acquisition length in seconds
    #[arg(short, long, default_value_t = DEFAULT_DURATION_S)]
    duration: f64,
    /// Sensor sampling rate in Hz
    #[arg(short, long, default_value_t = DEFAULT_SAMPLING_RATE_HZ)]
    rate: f64,
    /// CAPDAC offset level, clamped to 0-31
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    capdac: i64,
    /// Folder for the data file
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    output_dir: PathBuf,
    /// Data file name, without extension
    #[arg(long, default_value = DEFAULT_FILE_STEM)]
    file_name: String,
    /// Log level (overrides CAPDAC_LOG / RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging_with(args.log_level.as_deref());

    let config = SessionConfig {
        capdac: args.capdac,
        duration_s: args.duration,
        sampling_rate_hz: args.rate,
        ..SessionConfig::default()
    };
    let session = AcquisitionSession::new(config).context("invalid acquisition settings")?;
    let settings = SerialSettings {
        port: args.port.clone(),
        baud_rate: args.baud,
        read_timeout: Duration::from_millis(args.timeout_ms),
    };

    let result = {
        let mut transport = SerialTransport::open(&settings)
            .with_context(|| format!("check the communication port {}", args.port))?;
        session
            .run(&mut transport, &mut ThreadPacer)
            .context("communication with the device failed")?
    };

    if result.whole_frames {
        info!("total data received: {} samples", result.samples.len());
    } else {
        info!(
            "possible data loss, total data received: {:.3} samples",
            result.bytes_received as f64 / capdac_logger::FRAME_SIZE as f64
        );
    }

    info!("saving data, please wait...");
    let path = persist::data_file_path(&args.output_dir, &args.file_name)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;
    persist::save(&path, &result).with_context(|| format!("cannot write {}", path.display()))?;
    info!("done saving data to {}", path.display());
    Ok(())
}
