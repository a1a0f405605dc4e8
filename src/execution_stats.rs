//! Wall-clock summary printed at the end of a run.
use std::time::{Duration, Instant};

use humantime::format_duration;
use log::info;

/// What a finished run cost and produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub wall_time: Duration,
    pub simulated_days: f64,
    pub population: usize,
    pub messages_sent: u64,
}

impl RunStatistics {
    /// Zero for an empty run.
    #[must_use]
    pub fn wall_time_per_day(&self) -> Duration {
        if self.simulated_days > 0.0 {
            self.wall_time.div_f64(self.simulated_days)
        } else {
            Duration::ZERO
        }
    }

    /// Messages sent per simulated day, averaged over the population.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn messages_per_person_day(&self) -> f64 {
        if self.population == 0 || self.simulated_days <= 0.0 {
            return 0.0;
        }
        self.messages_sent as f64 / (self.population as f64 * self.simulated_days)
    }

    /// Prints the summary to stdout and logs it at info level.
    pub fn print(&self) {
        let lines = [
            ("Wall time:", format_duration(self.wall_time).to_string()),
            ("Simulated days:", self.simulated_days.to_string()),
            ("Wall time per day:", format_duration(self.wall_time_per_day()).to_string()),
            ("Population:", self.population.to_string()),
            ("Messages sent:", self.messages_sent.to_string()),
            (
                "Per person per day:",
                format!("{:.4}", self.messages_per_person_day()),
            ),
        ];
        println!("━━━━ Execution Summary ━━━━");
        for (label, value) in &lines {
            println!("{label:<25}{value}");
            info!("{label} {value}");
        }
    }
}

/// Started before setup so the wall time covers the whole run.
pub struct RunTimer {
    start: Instant,
}

impl RunTimer {
    #[must_use]
    pub fn start() -> RunTimer {
        RunTimer {
            start: Instant::now(),
        }
    }

    #[must_use]
    pub fn finish(&self, population: usize, simulated_days: f64, messages_sent: u64) -> RunStatistics {
        RunStatistics {
            wall_time: self.start.elapsed(),
            simulated_days,
            population,
            messages_sent,
        }
    }
}
