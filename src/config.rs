use std::str::FromStr;

use anyhow::{ensure, Context};

/// Tunables for the markdown report and CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Questions above this quantile of mean time are reported as slow.
    pub slow_question_quantile: f64,
    /// Student-vs-cohort timing gap, in seconds, worth reporting.
    pub time_gap_secs: f64,
    /// How many timing gaps to list per student.
    pub top_time_issues: usize,
    /// Cohort weak-question text is cut to this many characters in reports.
    pub report_text_width: usize,
    /// Width for slow-question and per-student question text.
    pub short_text_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slow_question_quantile: 0.75,
            time_gap_secs: 10.0,
            top_time_issues: 3,
            report_text_width: 100,
            short_text_width: 80,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            slow_question_quantile: env_or(
                "LEARNING_GAPS_SLOW_QUANTILE",
                defaults.slow_question_quantile,
            )?,
            time_gap_secs: env_or("LEARNING_GAPS_TIME_GAP_SECS", defaults.time_gap_secs)?,
            top_time_issues: env_or("LEARNING_GAPS_TOP_TIME_ISSUES", defaults.top_time_issues)?,
            report_text_width: env_or(
                "LEARNING_GAPS_REPORT_TEXT_WIDTH",
                defaults.report_text_width,
            )?,
            short_text_width: env_or("LEARNING_GAPS_SHORT_TEXT_WIDTH", defaults.short_text_width)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.slow_question_quantile),
            "slow question quantile must be within 0..=1, got {}",
            self.slow_question_quantile
        );
        ensure!(
            self.time_gap_secs.is_finite() && self.time_gap_secs >= 0.0,
            "time gap must be a non-negative number of seconds, got {}",
            self.time_gap_secs
        );
        ensure!(
            self.report_text_width > 0 && self.short_text_width > 0,
            "report text widths must be positive"
        );
        Ok(())
    }
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
