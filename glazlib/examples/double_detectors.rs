use std::env;
use std::time::Instant;

use glazlib::{GlazResult, GlazSession, IntegrationMode, SessionSource, TriggerMode};

/// The second detector's result
const CALCULATION_INDEX: i32 = 1;

fn main() -> GlazResult<()> {
    let rounds: usize = env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    let session = GlazSession::open(SessionSource::config("configs/double_spectrometer.xml"))?;
    println!("GlazLib version: {}", session.library().version());

    session.set_trigger_mode(TriggerMode::External)?;
    session.set_scan_count(10)?;
    session.set_integration_mode(IntegrationMode::PulseSync)?;
    session.set_integration_time(100)?;

    session.run_measurement()?;
    let (n_scans, pixels) = session.all_scans_sizes(CALCULATION_INDEX)?;
    println!("Size of all scans: {n_scans} x {pixels}");

    for round in 0..rounds {
        let start = Instant::now();
        session.run_measurement()?;
        let scans = session.all_scans(CALCULATION_INDEX)?;
        let peaks: Vec<u16> = scans
            .rows()
            .map(|row| row.iter().copied().max().unwrap_or_default())
            .collect();
        println!(
            "Round {round}: {} scans in {:0.3} sec, peaks {peaks:?}",
            scans.n_rows(),
            start.elapsed().as_secs_f64()
        );
    }

    session.close()
}
