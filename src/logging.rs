use std::io::Write;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

/// Install the process logger. Lines look like `[ts ms][thread] LEVEL msg`;
/// the filter defaults to `info` and follows `RUST_LOG` when set. Calling it
/// twice is harmless.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0);
            let current = thread::current();
            let thread_name = current.name().unwrap_or("unnamed");
            writeln!(
                buf,
                "[{ts}ms][{thread_name}] {:<5} {}",
                record.level(),
                record.args()
            )
        })
        .try_init();
}
