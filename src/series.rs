use serde::Serialize;

use crate::metrics::{QuestionPerformance, QuestionTiming, StudentPerformance, StudentTiming};
use crate::models::{ModuleAttemptRecord, ModuleHours, WeakItem};
use crate::selection::ComparisonPair;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Ordered labels plus one or more value series aligned with them.
///
/// An empty `ChartSeries` (no labels, no series) means "no data", which is
/// distinct from a series of zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub series: Vec<NamedSeries>,
}

impl ChartSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.series.is_empty()
    }
}

pub struct SeriesBuilder {
    labels: Vec<String>,
    series: Vec<NamedSeries>,
}

impl SeriesBuilder {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            series: Vec::new(),
        }
    }

    pub fn with_values<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<f64>,
    {
        let values = values
            .into_iter()
            .map(Into::into)
            .take(self.labels.len())
            .collect();
        self.series.push(NamedSeries {
            name: name.to_string(),
            values,
        });
        self
    }

    pub fn build(self) -> ChartSeries {
        if self.labels.is_empty() {
            return ChartSeries::empty();
        }
        ChartSeries {
            labels: self.labels,
            series: self.series,
        }
    }
}

/// Rows that know how to present themselves as a chart.
pub trait ChartReady {
    fn chart_series(&self) -> ChartSeries;
}

impl ChartReady for [QuestionPerformance] {
    fn chart_series(&self) -> ChartSeries {
        SeriesBuilder::new(self.iter().map(|row| row.question_id.as_str()))
            .with_values("Accuracy (%)", self.iter().map(|row| row.accuracy_pct))
            .build()
    }
}

impl ChartReady for [StudentPerformance] {
    fn chart_series(&self) -> ChartSeries {
        SeriesBuilder::new(self.iter().map(|row| row.student_id.as_str()))
            .with_values("Accuracy (%)", self.iter().map(|row| row.accuracy_pct))
            .build()
    }
}

impl ChartReady for [QuestionTiming] {
    fn chart_series(&self) -> ChartSeries {
        SeriesBuilder::new(self.iter().map(|row| row.question_id.as_str()))
            .with_values("Average Time (s)", self.iter().map(|row| row.avg_time_sec as f64))
            .with_values("Median Time (s)", self.iter().map(|row| row.median_time_sec as f64))
            .build()
    }
}

impl ChartReady for [StudentTiming] {
    fn chart_series(&self) -> ChartSeries {
        SeriesBuilder::new(self.iter().map(|row| row.question_id.as_str()))
            .with_values("Student Time (s)", self.iter().map(|row| row.student_time_sec as f64))
            .with_values("Cohort Time (s)", self.iter().map(|row| row.cohort_time_sec as f64))
            .build()
    }
}

impl ChartReady for [WeakItem] {
    fn chart_series(&self) -> ChartSeries {
        SeriesBuilder::new(self.iter().map(|item| item.question_id.as_str()))
            .with_values("Accuracy (%)", self.iter().map(|item| item.accuracy_pct))
            .build()
    }
}

impl ChartReady for [ModuleHours] {
    fn chart_series(&self) -> ChartSeries {
        SeriesBuilder::new(self.iter().map(|row| row.activity_name.as_str()))
            .with_values(
                "Self Learning Hours",
                self.iter().map(|row| row.self_learning_hours),
            )
            .build()
    }
}

pub fn accuracy_comparison(pair: &ComparisonPair) -> ChartSeries {
    SeriesBuilder::new(["Selected Student", "Cohort Average"])
        .with_values(
            "Accuracy (%)",
            [pair.student_accuracy_pct, pair.cohort_avg_accuracy_pct],
        )
        .build()
}

pub fn weak_comparison(pair: &ComparisonPair) -> ChartSeries {
    SeriesBuilder::new(["Selected Student", "Cohort Average"])
        .with_values(
            "Weak Questions",
            [pair.student_weak_count as f64, f64::from(pair.cohort_avg_weak_count)],
        )
        .build()
}

/// Score per attempt of one module, attempts already in order.
pub fn score_progression(attempts: &[ModuleAttemptRecord]) -> ChartSeries {
    SeriesBuilder::new(attempts.iter().map(|row| row.attempt_no.to_string()))
        .with_values("Score", attempts.iter().map(|row| row.calculated_score))
        .build()
}

pub fn study_time(attempts: &[ModuleAttemptRecord]) -> ChartSeries {
    SeriesBuilder::new(attempts.iter().map(|row| row.attempt_no.to_string()))
        .with_values("Hours", attempts.iter().map(|row| row.self_learning_hours))
        .build()
}

/// A titled chart together with the message shown when it has no data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub title: String,
    pub series: ChartSeries,
    pub empty_message: Option<String>,
}

impl Panel {
    pub fn new(
        title: impl Into<String>,
        series: ChartSeries,
        empty_message: impl Into<String>,
    ) -> Self {
        let empty_message = series.is_empty().then(|| empty_message.into());
        Self {
            title: title.into(),
            series,
            empty_message,
        }
    }

    pub fn has_data(&self) -> bool {
        !self.series.is_empty()
    }
}
