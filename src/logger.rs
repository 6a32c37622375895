use env_logger::{Builder, Env};
use std::io::Write;

/// Install the global logger with a one-line format. `level` is only the
/// default filter; a `RUST_LOG` value in the environment always wins, so a
/// run can be turned up to trace without touching the code.
///
/// Message bodies carry the `[Core <id>]`, `[SYSTEM]`, `[MSG]`,
/// `[LOAD BALANCER]` and `[SMP]` prefixes that the supervising dashboard
/// scrapes; everything in front of the body is local formatting only.
pub fn init(level: &str) {
    let mut builder =
        Builder::from_env(Env::default().default_filter_or(level.to_string()));

    builder.format(|buf, record| {
        let mut level_style = buf.default_level_style(record.level());
        level_style.set_intense(true);
        writeln!(
            buf,
            "[{} {} {}] {}",
            buf.timestamp_micros(),
            level_style.value(record.level()),
            record.target(),
            record.args()
        )
    });
    builder.init();
}
