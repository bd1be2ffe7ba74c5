use std::io::{self, Write};

use glazlib::{GlazResult, GlazSession, SessionSource};

fn main() -> GlazResult<()> {
    let session = GlazSession::open(SessionSource::config("configs/single_spectrometer.xml"))?;
    println!("GlazLib version: {}", session.library().version());

    println!("Capturing background...");
    session.capture_background(10)?;

    println!("Running measurement...");
    session.run_measurement()?;

    let data = session.result(0)?;
    println!("Got {} data points", data.len());
    if !data.is_empty() {
        let mut out = io::stdout().lock();
        for (pixel, value) in data.iter().enumerate() {
            writeln!(out, "{pixel}\t{value}")?;
        }
    }

    session.close()
}
