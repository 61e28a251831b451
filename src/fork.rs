//! Fork recovery
//!
//! A forked child inherits the parent's thread-local trace: same summary file
//! descriptor, same PRNG stream, same counts. The child hook drops the
//! inherited handle and re-initializes, so the child dumps to its own file
//! under its own pid.
//!
//! The hook is registered once per process. Registration is skipped while a
//! recovery is running so re-initialization can never stack another hook.
//!
//! Nothing on the recovery path logs: a subscriber lock held by another
//! parent thread at fork time is never released in the child.

use std::cell::Cell;
use std::sync::Once;

static REGISTER: Once = Once::new();

thread_local! {
    static RECOVERING: Cell<bool> = const { Cell::new(false) };
}

/// Register the post-fork child hook (idempotent)
pub fn install_fork_handler() {
    if in_recovery() {
        return;
    }
    REGISTER.call_once(|| {
        // SAFETY: `child_after_fork` is a plain function with no captured
        // state, valid for the life of the process.
        let rc = unsafe { libc::pthread_atfork(None, None, Some(child_after_fork)) };
        if rc != 0 {
            tracing::warn!("could not register fork handler: error {}", rc);
        }
    });
}

/// Whether the hook has been registered in this process (or its parent)
pub fn is_installed() -> bool {
    REGISTER.is_completed()
}

/// Whether the calling thread is inside a fork recovery
pub fn in_recovery() -> bool {
    RECOVERING.try_with(Cell::get).unwrap_or(false)
}

/// Run `recover` with the recovery guard raised
pub(crate) fn guarded<F: FnOnce()>(recover: F) {
    if in_recovery() {
        return;
    }
    let _ = RECOVERING.try_with(|flag| flag.set(true));
    recover();
    let _ = RECOVERING.try_with(|flag| flag.set(false));
}

unsafe extern "C" fn child_after_fork() {
    crate::local::recover_after_fork();
}
