//! Named wall-clock timers around transforms and solves.
//!
//! Disabled by default, in which case every call compiles to nothing.
//! Build with `--features profiling` to collect timings:
//!
//! ```
//! use chanspec_core::profiler::{start_timer, stop_timer, profile_json};
//!
//! start_timer("poisson_solve");
//! // ... work ...
//! stop_timer("poisson_solve");
//! let report = profile_json();
//! ```

#[cfg(feature = "profiling")]
mod enabled {
    use std::collections::HashMap;
    use std::sync::{LazyLock, Mutex, MutexGuard};
    use std::time::{Duration, Instant};

    use serde::Serialize;

    #[derive(Debug, Default)]
    struct Entry {
        total: Duration,
        calls: usize,
        max: Duration,
        active_start: Option<Instant>,
    }

    static PROFILER: LazyLock<Mutex<HashMap<String, Entry>>> =
        LazyLock::new(|| Mutex::new(HashMap::new()));

    fn profiler() -> MutexGuard<'static, HashMap<String, Entry>> {
        match PROFILER.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Timing summary of one named section.
    #[derive(Debug, Clone, Serialize)]
    pub struct SectionTiming {
        pub name: String,
        pub calls: usize,
        pub total_ms: f64,
        pub avg_us: f64,
        pub max_us: f64,
    }

    #[inline]
    pub fn start_timer(name: &str) {
        profiler().entry(name.to_string()).or_default().active_start = Some(Instant::now());
    }

    #[inline]
    pub fn stop_timer(name: &str) {
        if let Some(entry) = profiler().get_mut(name) {
            if let Some(start) = entry.active_start.take() {
                let elapsed = start.elapsed();
                entry.total += elapsed;
                entry.calls += 1;
                entry.max = entry.max.max(elapsed);
            }
        }
    }

    pub fn reset_profile() {
        profiler().clear();
    }

    /// Sections sorted by total time, longest first.
    pub fn profile_data() -> Vec<SectionTiming> {
        let mut sections: Vec<SectionTiming> = profiler()
            .iter()
            .map(|(name, e)| SectionTiming {
                name: name.clone(),
                calls: e.calls,
                total_ms: e.total.as_secs_f64() * 1e3,
                avg_us: if e.calls > 0 { e.total.as_secs_f64() * 1e6 / e.calls as f64 } else { 0.0 },
                max_us: e.max.as_secs_f64() * 1e6,
            })
            .collect();
        sections.sort_by(|a, b| b.total_ms.total_cmp(&a.total_ms));
        sections
    }

    pub fn profile_json() -> String {
        serde_json::to_string_pretty(&profile_data()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn print_profile() {
        let sections = profile_data();
        if sections.is_empty() {
            println!("No profiling data collected.");
            return;
        }
        println!("{:<28} {:>10} {:>8} {:>10} {:>10}", "section", "total ms", "calls", "avg us", "max us");
        for s in &sections {
            println!(
                "{:<28} {:>10.2} {:>8} {:>10.1} {:>10.1}",
                s.name, s.total_ms, s.calls, s.avg_us, s.max_us
            );
        }
    }
}

#[cfg(feature = "profiling")]
pub use enabled::*;

#[cfg(not(feature = "profiling"))]
mod disabled {
    #[inline(always)]
    pub fn start_timer(_name: &str) {}

    #[inline(always)]
    pub fn stop_timer(_name: &str) {}

    #[inline(always)]
    pub fn reset_profile() {}

    pub fn profile_json() -> String {
        "[]".to_string()
    }

    #[inline(always)]
    pub fn print_profile() {}
}

#[cfg(not(feature = "profiling"))]
pub use disabled::*;
