//! Ctrl+C / SIGTERM handling. A watcher thread waits for the signal, removes
//! the temporary files, wipes the screen and exits, so an interrupted session
//! never leaves assignments behind.

use std::io;

use crate::scratch::Janitor;

#[cfg(unix)]
pub fn install(janitor: Janitor) -> io::Result<()> {
    use std::io::Write;
    use std::thread;

    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use tracing::{info, warn};

    use crate::terminal::CLEAR_SEQUENCE;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("trustee-signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal, "interrupt received; cleaning up");
                for err in janitor.sweep() {
                    warn!(error = %err, "temporary file cleanup failed");
                }
                let mut stdout = io::stdout();
                let _ = stdout.write_all(CLEAR_SEQUENCE.as_bytes());
                let _ = stdout.flush();
                eprintln!("Interrupted. Temporary file removed.");
                std::process::exit(128 + signal);
            }
        })?;
    Ok(())
}

/// Without unix signals the default Ctrl+C behaviour applies; temp files are
/// still swept on every normal and error exit.
#[cfg(not(unix))]
pub fn install(_janitor: Janitor) -> io::Result<()> {
    Ok(())
}
