use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{self, Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use glazlib::{
    AcquisitionSettings, DeviceType, GlazSession, ScanMatrix, SessionSource, config,
    set_library_dir,
};

/// Open a GlazLib session, take a measurement and summarise it
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration document, as a path or a name to look up
    #[arg(short, long, conflicts_with = "device")]
    config: Option<String>,

    /// Open a single device of this type instead of a configuration document
    #[arg(short, long)]
    device: Option<DeviceType>,

    /// Fail rather than fall back to a demo device when no hardware is attached. Configuration
    /// documents decide this for themselves.
    #[arg(long, conflicts_with = "config")]
    no_demo: bool,

    /// TOML file of acquisition settings to apply before measuring
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Capture a background averaged over this many scans first
    #[arg(short, long)]
    background: Option<i32>,

    /// The result to report on
    #[arg(short, long, default_value_t = 0)]
    index: i32,

    /// Measure asynchronously, polling for completion at this interval
    #[arg(long)]
    async_poll_ms: Option<u64>,

    /// Give up on an asynchronous measurement after this many seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Write the raw scans to this file as little-endian u16 samples
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Root of the native library tree
    #[arg(long)]
    library_dir: Option<PathBuf>,

    /// List the configuration documents that can be found and exit
    #[arg(long)]
    list_configs: bool,
}

impl Args {
    fn source(&self) -> SessionSource {
        let allow_demo = !self.no_demo;
        match (&self.config, self.device) {
            (Some(config), _) => SessionSource::config(config),
            (None, Some(device)) => SessionSource::Device {
                device,
                use_defaults: true,
                allow_demo,
            },
            (None, None) => SessionSource::Auto {
                device: DeviceType::default(),
                use_defaults: true,
                allow_demo,
            },
        }
    }
}

fn load_settings(path: &Path) -> Result<AcquisitionSettings, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let settings: AcquisitionSettings = toml::from_str(&text)?;
    Ok(settings)
}

fn summarise(name: &str, values: &[f64]) {
    if values.is_empty() {
        println!("{name}: no data");
        return;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    println!(
        "{name}: {} points, min {min:.2}, max {max:.2}, mean {mean:.2}",
        values.len()
    );
}

fn measure(session: &GlazSession, args: &Args) -> Result<(), Box<dyn Error>> {
    println!("GlazLib version {}", session.library().version());

    if let Some(path) = args.settings.as_ref() {
        let settings = load_settings(path)?;
        tracing::info!("applying {} settings from {}", settings.to_settings().len(), path.display());
        session.configure_all(settings.to_settings())?;
    }

    if let Some(count) = args.background {
        println!("Capturing background over {count} scans");
        session.capture_background(count)?;
    }

    let start = time::Instant::now();
    match args.async_poll_ms {
        Some(ms) => {
            session.start_measurement()?;
            session.wait_for_measurement(
                Duration::from_millis(ms),
                Duration::from_secs(args.timeout_secs),
            )?;
        }
        None => session.run_measurement()?,
    }
    println!("Measured in {:0.3} seconds", start.elapsed().as_secs_f32());

    summarise("Result", &session.result(args.index)?);

    let scans: ScanMatrix = session.all_scans(args.index)?;
    let (rows, cols) = scans.shape();
    println!("All scans: {rows} scans of {cols} pixels");
    if !scans.is_empty() {
        summarise("Mean scan", &scans.column_means());
    }

    if let Some(path) = args.dump.as_ref() {
        let handle = io::BufWriter::new(fs::File::create(path)?);
        scans.write_raw(handle)?;
        println!("Wrote {rows} x {cols} samples to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list_configs {
        for path in config::list_available_configs(&config::default_search_dirs())? {
            println!("{}", path.display());
        }
        return Ok(());
    }

    if let Some(dir) = args.library_dir.as_ref() {
        set_library_dir(dir);
    }

    let session = GlazSession::open(args.source())?;
    let outcome = measure(&session, &args);
    let closed = session.close();
    outcome?;
    closed?;
    Ok(())
}
