use std::{thread, time::Duration};

use once_cell::sync::OnceCell;

use multikern::core::System;

static LOGGER: OnceCell<()> = OnceCell::new();

/// initialize logging once per test binary
pub fn init() {
    LOGGER.get_or_init(|| multikern::logger::init("INFO"));
}

/// poll `check` until it succeeds, pausing `pause` between attempts; panics
/// with the last error once the attempt budget runs out
#[allow(dead_code)]
pub fn retry<F, T, E>(attempts: u32, pause: Duration, mut check: F) -> T
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Debug,
{
    let mut last_err = None;
    for attempt in 0 .. attempts {
        if attempt > 0 {
            thread::sleep(pause);
        }
        match check() {
            Ok(result) => return result,
            Err(e) => last_err = Some(e),
        }
    }
    panic!("condition never held after {} attempts: {:?}", attempts, last_err);
}

/// bring up a running system with `cores` kernel instances
#[allow(dead_code)]
pub fn started(cores: usize, seed: u64) -> System {
    init();
    let system = System::new(cores, seed);
    system.start().unwrap();
    system
}
