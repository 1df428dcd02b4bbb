use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use crate::logvbln;

/// Logs how long a scope took once it is dropped.
pub struct Benchmark {
    time: Instant,
    label: &'static str,
}

impl Benchmark {
    const CC: &'static str = "Benchmark";

    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            time: Instant::now(),
        }
    }

    pub fn label(&self) -> &str {
        self.label
    }

    pub fn elapsed(&self) -> Duration {
        self.time.elapsed()
    }
}

impl Drop for Benchmark {
    fn drop(&mut self) {
        logvbln!("{}: {}", self.label, self);
    }
}

impl Display for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_duration(self.elapsed()))
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{:0>2}:{:0>2}min", secs / 60, secs % 60)
    }
}
