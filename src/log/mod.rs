//! Diagnostic logging, separate from the CSV output in [`crate::report`].
//!
//! The crate logs with the `log` macros re-exported here:
//!
//!  - `info`: run setup and one budget line per simulated day
//!  - `debug`: dispatch decisions, test results and mailbox evictions
//!  - `trace`: individual messages, infections and RNG creation
//!
//! Nothing is printed until [`set_log_level`] installs the stderr logger,
//! which the runner does for `--log-level <level>`.
mod standard_logger;

pub use log::{debug, error, info, trace, warn, LevelFilter};

use std::sync::{LazyLock, Mutex};

use log4rs::Handle;

// Set once the first call installs the global logger; later calls reconfigure it.
static LOGGER: LazyLock<Mutex<Option<Handle>>> = LazyLock::new(Mutex::default);

/// Routes messages at `level` and above to stderr. `LevelFilter::Off`
/// silences the crate again.
pub fn set_log_level(level: LevelFilter) {
    let mut handle = LOGGER.lock().expect("Mutex poisoned");
    standard_logger::apply(&mut handle, level);
}
