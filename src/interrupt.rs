// src/interrupt.rs
// USER INTERRUPT (Ctrl-C)
// The handler only flips an atomic flag. Long-running loops poll `requested()`
// and unwind normally, so child process groups are always reaped.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signum: libc::c_int) {
    // Async-signal-safe: a single atomic store
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Installs the SIGINT handler. Call once, early in `main`.
pub fn install() -> std::io::Result<()> {
    let handler = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler performs one atomic store and nothing else.
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

pub fn requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
