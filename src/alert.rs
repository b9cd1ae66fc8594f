use std::io::{self, Write};

/// Ring the terminal bell.
///
/// Only audible when a terminal is attached; a GUI build without a console
/// drops it silently.
pub fn ring_bell() {
    let mut stderr = io::stderr();
    if let Err(e) = stderr.write_all(b"\x07").and_then(|_| stderr.flush()) {
        log::debug!("Could not ring bell: {}", e);
    }
}
