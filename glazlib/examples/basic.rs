use std::thread;
use std::time::Duration;

use glazlib::config::{default_search_dirs, list_available_configs};
use glazlib::{Averaging, GlazResult, GlazSession, SessionSource, TriggerMode};

fn run(session: &GlazSession) -> GlazResult<()> {
    println!("GlazLib version: {}", session.library().version());

    println!("Fine-tuning device settings...");
    session.set_trigger_mode(TriggerMode::Internal)?;
    session.set_internal_trigger_frequency(100.0)?;
    session.set_hardware_averaging(Averaging::X8)?;
    session.set_scan_count(10)?;

    println!("Capturing background...");
    session.capture_background(5)?;

    println!("Running measurement...");
    session.run_measurement()?;

    let data = session.result(0)?;
    if data.is_empty() {
        println!("No data received from measurement");
    } else {
        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = data.iter().sum::<f64>() / data.len() as f64;
        println!("Received {} data points", data.len());
        println!("Data min: {min}, max: {max}, mean: {mean:.2}");
    }

    println!("Running non-blocking measurement...");
    session.start_measurement()?;
    while !session.is_measurement_done()? {
        println!("Measurement in progress...");
        thread::sleep(Duration::from_millis(500));
    }
    println!("Non-blocking measurement complete");

    let (n_scans, pixels) = session.all_scans_sizes(0)?;
    println!("Measurement collected {n_scans} scans with {pixels} pixels each");

    match session.all_scans(0) {
        Ok(scans) if !scans.is_empty() => println!("All scans shape: {:?}", scans.shape()),
        Ok(_) => println!("No scans retained"),
        Err(e) => println!("Could not retrieve all scans: {e}"),
    }
    Ok(())
}

fn main() -> GlazResult<()> {
    println!("Available configuration files:");
    for path in list_available_configs(&default_search_dirs())? {
        println!("  - {}", path.display());
    }

    let session = match GlazSession::open(SessionSource::config("single_spectrometer.xml")) {
        Ok(session) => session,
        Err(e) => {
            println!("Error with single_spectrometer.xml: {e}");
            println!("Trying with default initialization...");
            GlazSession::open(SessionSource::default())?
        }
    };

    if let Err(e) = run(&session) {
        println!("Error during operation: {e}");
    }
    println!("Closing GlazLib session...");
    session.close()?;
    println!("Done");
    Ok(())
}
