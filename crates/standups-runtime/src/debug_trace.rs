#![forbid(unsafe_code)]

//! Stderr tracing of effect scheduling, for chasing timing bugs.
//!
//! `STANDUPS_DEBUG_TRACE=1` (or `true`, `on`) turns it on. The variable is
//! read once; afterwards a disabled trace costs one bool load. Lines carry the
//! milliseconds since the first trace and the emitting thread, since effects
//! run on their own threads:
//!
//! ```text
//! [standups    12ms standups-effect-save-standups] debounce: cancelled pending request in save-debounce
//! ```

use std::sync::LazyLock;
use std::time::Instant;

static ENABLED: LazyLock<bool> =
    LazyLock::new(|| parse_flag(std::env::var("STANDUPS_DEBUG_TRACE").ok().as_deref()));

static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("on")
    })
}

#[inline]
pub fn is_enabled() -> bool {
    *ENABLED
}

/// Milliseconds since the first trace line.
pub fn elapsed_ms() -> u64 {
    u64::try_from(EPOCH.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Name of the current thread, or `?` for unnamed threads.
pub fn thread_label() -> String {
    std::thread::current().name().unwrap_or("?").to_string()
}

/// `eprintln!` a timestamped line when `STANDUPS_DEBUG_TRACE` is on.
#[macro_export]
macro_rules! debug_trace {
    ($($arg:tt)*) => {
        if $crate::debug_trace::is_enabled() {
            eprintln!(
                "[standups {:>5}ms {}] {}",
                $crate::debug_trace::elapsed_ms(),
                $crate::debug_trace::thread_label(),
                format_args!($($arg)*)
            );
        }
    };
}
