//! Report command - compares training data with live prediction traffic.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use datastore::{PredictionLogStore, StationDataset};
use object_store::ObjectStore;
use station_structs::{PipelineResult, PredictionLogEntry, StationRecord};
use tracing::info;

/// Number of log rows shown as examples.
const RECENT_ROWS: usize = 5;

/// Number of most frequent values compared per feature.
const TOP_VALUES: usize = 5;

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; zero for a single value
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    /// Returns `None` for an empty column.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count,
            mean,
            std,
            min,
            max,
        })
    }
}

/// Most frequent values of a feature, most common first.
///
/// Ties are broken by value so the output is stable.
#[must_use]
pub fn top_counts<I>(values: I, limit: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(limit);
    counts
}

/// Training vs. live value counts of one feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureComparison {
    pub feature: &'static str,
    pub training: Vec<(String, usize)>,
    pub live: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringReport {
    pub training_rows: usize,
    pub log_rows: usize,
    pub training_target: Option<SummaryStats>,
    pub predictions: Option<SummaryStats>,
    pub recent: Vec<PredictionLogEntry>,
    pub features: Vec<FeatureComparison>,
}

impl MonitoringReport {
    #[must_use]
    pub fn build(training: &[StationRecord], log: &[PredictionLogEntry]) -> Self {
        let targets: Vec<f64> = training.iter().map(|r| r.sessions_per_day).collect();
        let predictions: Vec<f64> = log.iter().map(|e| e.prediction).collect();

        let features = vec![
            FeatureComparison {
                feature: "region",
                training: top_counts(
                    training
                        .iter()
                        .map(|r| r.region.clone().unwrap_or_else(|| String::from("<missing>"))),
                    TOP_VALUES,
                ),
                live: top_counts(log.iter().map(|e| e.request.region.clone()), TOP_VALUES),
            },
            FeatureComparison {
                feature: "num_connectors",
                training: top_counts(
                    training.iter().map(|r| r.num_connectors.to_string()),
                    TOP_VALUES,
                ),
                live: top_counts(
                    log.iter().map(|e| e.request.num_connectors.to_string()),
                    TOP_VALUES,
                ),
            },
            FeatureComparison {
                feature: "power_kw",
                training: top_counts(training.iter().map(|r| r.power_kw.to_string()), TOP_VALUES),
                live: top_counts(
                    log.iter().map(|e| e.request.power_kw.to_string()),
                    TOP_VALUES,
                ),
            },
        ];

        Self {
            training_rows: training.len(),
            log_rows: log.len(),
            training_target: SummaryStats::from_values(&targets),
            predictions: SummaryStats::from_values(&predictions),
            recent: log[log.len().saturating_sub(RECENT_ROWS)..].to_vec(),
            features,
        }
    }

    /// Loads both inputs and builds the report.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DataNotFound`] if the dataset or the
    /// prediction log does not exist yet.
    ///
    /// [`PipelineError::DataNotFound`]: station_structs::PipelineError::DataNotFound
    pub async fn load(store: Arc<dyn ObjectStore>) -> PipelineResult<Self> {
        let training = StationDataset::new(Arc::clone(&store)).read_records().await?;
        let log = PredictionLogStore::new(store).read_existing().await?;

        Ok(Self::build(&training, &log))
    }

    /// Writes the report to the log.
    pub fn emit(&self) {
        info!(
            training_rows = self.training_rows,
            prediction_logs = self.log_rows,
            "Shapes"
        );

        emit_stats("sessions_per_day", self.training_target.as_ref());
        emit_stats("prediction", self.predictions.as_ref());

        for entry in &self.recent {
            info!(
                timestamp_utc = %entry.timestamp_utc,
                prediction = entry.prediction,
                region = %entry.request.region,
                city_type = %entry.request.city_type,
                charger_type = %entry.request.charger_type,
                power_kw = entry.request.power_kw,
                num_connectors = entry.request.num_connectors,
                "Recent prediction"
            );
        }

        for comparison in &self.features {
            info!(
                feature = comparison.feature,
                training = ?comparison.training,
                live = ?comparison.live,
                "Top values, training vs. live"
            );
        }
    }
}

fn emit_stats(column: &str, stats: Option<&SummaryStats>) {
    match stats {
        Some(s) => info!(
            column,
            count = s.count,
            mean = s.mean,
            std = s.std,
            min = s.min,
            max = s.max,
            "Summary"
        ),
        None => info!(column, "No values"),
    }
}

/// Runs the report command.
///
/// # Errors
///
/// Returns an error if an input is missing or unreadable.
pub async fn run(store: Arc<dyn ObjectStore>) -> Result<()> {
    MonitoringReport::load(store).await?.emit();
    Ok(())
}
