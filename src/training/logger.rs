//! Structured logging for training runs.

/// How much the trainer reports while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// Warnings only.
    Warning,
    /// Per-rule progress and summaries.
    Info,
    /// Everything, including per-refinement details.
    Debug,
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::Info
    }
}

/// Verbosity-gated logger used by the trainer.
#[derive(Debug, Clone)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    /// Create a logger with the given verbosity.
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// The configured verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Log a warning.
    pub fn warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Warning {
            eprintln!("[warn] {}", message);
        }
    }

    /// Log an informational message.
    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Info {
            println!("[info] {}", message);
        }
    }

    /// Log a debug message.
    pub fn debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Debug {
            println!("[debug] {}", message);
        }
    }

    /// Log one committed rule.
    pub fn log_rule(&self, num_rules: u32, num_conditions: usize, quality: f64) {
        if self.verbosity >= Verbosity::Info {
            println!(
                "[info] rule {}: {} condition(s), quality {:.6}",
                num_rules, num_conditions, quality
            );
        }
    }
}
