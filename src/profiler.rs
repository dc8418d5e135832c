// profiler.rs
// Lightweight scope profiler. Compiled to a no-op unless the `profiling`
// feature is enabled.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Default)]
struct SpanStats {
    total: Duration,
    calls: u64,
}

/// Accumulates wall-clock time per named scope across iterations.
pub struct Profiler {
    spans: BTreeMap<&'static str, SpanStats>,
}

impl Profiler {
    pub fn new() -> Self {
        Self { spans: BTreeMap::new() }
    }

    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        let entry = self.spans.entry(name).or_default();
        entry.total += elapsed;
        entry.calls += 1;
    }

    /// Scopes with their accumulated time, slowest first.
    pub fn report_sorted(&self) -> Vec<(&'static str, Duration, u64)> {
        let mut rows: Vec<_> = self
            .spans
            .iter()
            .map(|(name, s)| (*name, s.total, s.calls))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows
    }

    pub fn print_and_clear(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        println!("Profile:");
        for (name, total, calls) in self.report_sorted() {
            let avg = total / calls.max(1) as u32;
            println!("  {:<24} {:>10.3?} total  {:>8} calls  {:>10.3?} avg", name, total, calls, avg);
        }
        self.spans.clear();
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports the elapsed time of its scope to the global profiler on drop.
#[cfg_attr(not(feature = "profiling"), allow(dead_code))]
pub struct ScopeTimer {
    name: &'static str,
    start: Instant,
}

pub fn enter(name: &'static str) -> ScopeTimer {
    ScopeTimer { name, start: Instant::now() }
}

#[cfg(feature = "profiling")]
impl Drop for ScopeTimer {
    fn drop(&mut self) {
        crate::PROFILER.lock().record(self.name, self.start.elapsed());
    }
}

/// Times the enclosing scope under the given name when profiling is enabled.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _scope_timer = $crate::profiler::enter($name);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_calls() {
        let mut p = Profiler::new();
        p.record("step", Duration::from_millis(4));
        p.record("step", Duration::from_millis(6));
        p.record("bubbles", Duration::from_millis(3));
        let rows = p.report_sorted();
        assert_eq!(rows.len(), 2, "two distinct scopes recorded");
        assert_eq!(rows[0].0, "step", "slowest scope sorts first");
        assert_eq!(rows[0].1, Duration::from_millis(10), "same-name scopes accumulate time");
        assert_eq!(rows[0].2, 2, "same-name scopes accumulate call count");
    }
}
