//! Small helpers shared across modules.
//!
//! Grounded on the teacher's `utils.rs`: the `HandyRwLock` shortcut trait
//! (`wl()`/`rl()` instead of `.write().unwrap()`/`.read().unwrap()`) and
//! `init_log`.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A handy shortcut to replace the `RwLock` write/read().unwrap() pattern
/// with `wl()`/`rl()`.
///
/// Copied in spirit from
/// <https://github.com/tikv/tikv/blob/b15ea3b1cd766375cb52019e35c195ed797124df/components/tikv_util/src/lib.rs#L171-L186>,
/// same as the teacher crate.
pub trait HandyRwLock<T> {
    fn wl(&self) -> RwLockWriteGuard<'_, T>;
    fn rl(&self) -> RwLockReadGuard<'_, T>;
}

impl<T> HandyRwLock<T> for RwLock<T> {
    fn wl(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap()
    }

    fn rl(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap()
    }
}

/// Ceiling integer division, used throughout the B+tree code to size
/// slots/headers.
pub fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Initialize the global logger. Idempotent: safe to call from every
/// test's `setup()`.
pub fn init_log() {
    use std::io::Write;
    use std::sync::Once;

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format_timestamp_micros()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {}] {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}
