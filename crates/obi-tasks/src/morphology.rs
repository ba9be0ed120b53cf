//! Morphology metrics
//!
//! [`MorphologyMetricsScanConfig`] sweeps morphology files and neurite
//! types. The run hook of each `MorphologyMetrics` coordinate hands the
//! file to a [`MorphologyAnalysis`] backend and writes the results, with
//! array-valued metrics reduced to [`SummaryStatistics`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use obi_model::{impl_block, BlockSlot, Form, Sweepable};
use obi_scan::output::write_json;
use obi_scan::{CoordinateHooks, ScanError, SingleCoordinate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::stats::SummaryStatistics;

/// File written by the run hook
pub const MORPHOLOGY_METRICS_FILE: &str = "morphology_metrics.json";

/// Metrics requested from the backend
pub const REQUESTED_METRICS: [&str; 5] = [
    "number_of_points",
    "total_length",
    "max_radial_distance",
    "segment_lengths",
    "radii",
];

/// Morphology selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct MorphologyMetricsInitialize {
    /// Morphology file
    pub morphology: Sweepable<PathBuf>,
    /// Neurite type to analyze (`all`, `axon`, `basal_dendrite`, `apical_dendrite`)
    pub neurite_type: Sweepable<String>,
}

impl_block!(MorphologyMetricsInitialize { morphology, neurite_type });

/// Morphology metrics scan form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct MorphologyMetricsScanConfig {
    pub initialize: MorphologyMetricsInitialize,
}

impl Form for MorphologyMetricsScanConfig {
    const TYPE_NAME: &'static str = "MorphologyMetricsScanConfig";
    const SINGLE_TYPE_NAME: &'static str = "MorphologyMetrics";

    fn block_slots(&self) -> Vec<BlockSlot<'_>> {
        vec![BlockSlot::Block {
            name: "initialize",
            block: &self.initialize,
        }]
    }
}

impl CoordinateHooks for MorphologyMetricsScanConfig {
    fn run(coordinate: &SingleCoordinate<Self>) -> Result<(), ScanError> {
        run_metrics(coordinate, &SwcAnalysis).map(|_| ())
    }
}

/// Value returned by an analysis backend for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Samples(Vec<f64>),
}

/// Reported value of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricReport {
    Scalar(f64),
    Summary(Option<SummaryStatistics>),
}

impl From<MetricValue> for MetricReport {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Scalar(x) => Self::Scalar(x),
            MetricValue::Samples(samples) => Self::Summary(SummaryStatistics::from_samples(&samples)),
        }
    }
}

/// Contents of the metrics file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphologyMetricsReport {
    pub morphology: PathBuf,
    pub neurite_type: String,
    pub metrics: IndexMap<String, MetricReport>,
}

/// Black-box morphology analysis
pub trait MorphologyAnalysis {
    /// Compute the requested metrics of a morphology file
    ///
    /// # Errors
    /// Returns error if the file cannot be analyzed
    fn compute(
        &self,
        morphology: &Path,
        neurite_type: &str,
        metrics: &[&str],
    ) -> Result<IndexMap<String, MetricValue>, AnalysisError>;
}

/// Analysis errors
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unknown neurite type '{0}'")]
    UnknownNeuriteType(String),

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),
}

/// Run the analysis of one coordinate and write the metrics file
///
/// # Errors
/// Returns [`ScanError::Task`] if the backend fails, or the write error
pub fn run_metrics(
    coordinate: &SingleCoordinate<MorphologyMetricsScanConfig>,
    backend: &dyn MorphologyAnalysis,
) -> Result<PathBuf, ScanError> {
    let initialize = &coordinate.config().initialize;
    let (Some(morphology), Some(neurite_type)) = (
        initialize.morphology.resolved(),
        initialize.neurite_type.resolved(),
    ) else {
        return Err(task_error("morphology and neurite_type must be resolved"));
    };

    info!(morphology = %morphology.display(), neurite_type = %neurite_type, "computing morphology metrics");
    let metrics = backend
        .compute(morphology, neurite_type, &REQUESTED_METRICS)
        .map_err(|err| task_error(err.to_string()))?;

    let report = MorphologyMetricsReport {
        morphology: morphology.clone(),
        neurite_type: neurite_type.clone(),
        metrics: metrics
            .into_iter()
            .map(|(name, value)| (name, MetricReport::from(value)))
            .collect(),
    };

    let path = coordinate.coordinate_output_root().join(MORPHOLOGY_METRICS_FILE);
    write_json(&path, &serde_json::to_value(&report)?)?;
    debug!(idx = coordinate.idx(), path = %path.display(), "metrics written");
    Ok(path)
}

fn task_error(message: impl Into<String>) -> ScanError {
    ScanError::Task {
        type_name: MorphologyMetricsScanConfig::SINGLE_TYPE_NAME,
        message: message.into(),
    }
}

/// Backend reading SWC files
#[derive(Debug, Clone, Copy, Default)]
pub struct SwcAnalysis;

#[derive(Debug, Clone, Copy)]
struct SwcPoint {
    kind: i64,
    position: [f64; 3],
    radius: f64,
    parent: i64,
}

impl SwcAnalysis {
    fn parse(text: &str) -> Result<Vec<(i64, SwcPoint)>, AnalysisError> {
        let mut points = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 7 {
                return Err(AnalysisError::Parse {
                    line: i + 1,
                    message: format!("expected 7 columns, found {}", columns.len()),
                });
            }
            let number = |idx: usize| {
                columns[idx].parse::<f64>().map_err(|err| AnalysisError::Parse {
                    line: i + 1,
                    message: format!("column {}: {err}", idx + 1),
                })
            };
            let integer = |idx: usize| {
                columns[idx].parse::<i64>().map_err(|err| AnalysisError::Parse {
                    line: i + 1,
                    message: format!("column {}: {err}", idx + 1),
                })
            };

            points.push((
                integer(0)?,
                SwcPoint {
                    kind: integer(1)?,
                    position: [number(2)?, number(3)?, number(4)?],
                    radius: number(5)?,
                    parent: integer(6)?,
                },
            ));
        }
        Ok(points)
    }

    fn neurite_filter(neurite_type: &str) -> Result<Option<i64>, AnalysisError> {
        match neurite_type {
            "all" => Ok(None),
            "axon" => Ok(Some(2)),
            "basal_dendrite" => Ok(Some(3)),
            "apical_dendrite" => Ok(Some(4)),
            other => Err(AnalysisError::UnknownNeuriteType(other.to_string())),
        }
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

impl MorphologyAnalysis for SwcAnalysis {
    #[allow(clippy::cast_precision_loss)]
    fn compute(
        &self,
        morphology: &Path,
        neurite_type: &str,
        metrics: &[&str],
    ) -> Result<IndexMap<String, MetricValue>, AnalysisError> {
        let filter = Self::neurite_filter(neurite_type)?;
        let text = std::fs::read_to_string(morphology).map_err(|source| AnalysisError::Io {
            path: morphology.to_path_buf(),
            source,
        })?;
        let points = Self::parse(&text)?;

        let by_id: HashMap<i64, SwcPoint> = points.iter().copied().collect();
        let origin = points
            .iter()
            .find(|(_, p)| p.kind == 1)
            .or_else(|| points.first())
            .map_or([0.0; 3], |(_, p)| p.position);
        let selected: Vec<SwcPoint> = points
            .iter()
            .map(|(_, p)| *p)
            .filter(|p| filter.map_or(true, |kind| p.kind == kind))
            .collect();
        let segment_lengths: Vec<f64> = selected
            .iter()
            .filter_map(|p| by_id.get(&p.parent).map(|parent| distance(p.position, parent.position)))
            .collect();

        let mut values = IndexMap::new();
        for &metric in metrics {
            let value = match metric {
                "number_of_points" => MetricValue::Scalar(selected.len() as f64),
                "total_length" => MetricValue::Scalar(segment_lengths.iter().sum()),
                "max_radial_distance" => MetricValue::Scalar(
                    selected
                        .iter()
                        .map(|p| distance(p.position, origin))
                        .fold(0.0, f64::max),
                ),
                "segment_lengths" => MetricValue::Samples(segment_lengths.clone()),
                "radii" => MetricValue::Samples(selected.iter().map(|p| p.radius).collect()),
                other => return Err(AnalysisError::UnknownMetric(other.to_string())),
            };
            values.insert(metric.to_string(), value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obi_scan::{ExecutionMode, GridScan};
    use pretty_assertions::assert_eq;

    const SWC: &str = "\
# soma and two neurites
1 1 0 0 0 5 -1
2 2 0 3 4 1 1
3 2 0 6 8 0.5 2
4 3 3 0 4 2 1
";

    fn form(morphology: PathBuf) -> MorphologyMetricsScanConfig {
        MorphologyMetricsScanConfig {
            initialize: MorphologyMetricsInitialize {
                morphology: Sweepable::Resolved(morphology),
                neurite_type: Sweepable::Swept(vec!["all".into(), "axon".into()]),
            },
        }
    }

    #[test]
    fn swc_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cell.swc");
        std::fs::write(&path, SWC).unwrap();

        let metrics = SwcAnalysis.compute(&path, "axon", &REQUESTED_METRICS).unwrap();
        assert_eq!(metrics["number_of_points"], MetricValue::Scalar(2.0));
        assert_eq!(metrics["total_length"], MetricValue::Scalar(10.0));
        assert_eq!(metrics["max_radial_distance"], MetricValue::Scalar(10.0));
        assert_eq!(metrics["radii"], MetricValue::Samples(vec![1.0, 0.5]));
    }

    #[test]
    fn unknown_neurite_type() {
        let err = SwcAnalysis
            .compute(Path::new("/unused.swc"), "dendrite", &REQUESTED_METRICS)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownNeuriteType(_)));
    }

    #[test]
    fn malformed_line() {
        let err = SwcAnalysis::parse("1 1 0 0").unwrap_err();
        assert!(err.to_string().starts_with("line 1"));
    }

    #[test]
    fn run_writes_summary_per_coordinate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cell.swc");
        std::fs::write(&path, SWC).unwrap();

        let scan = GridScan::new(form(path), dir.path().join("scan"));
        let summary = scan.execute(ExecutionMode::Run).unwrap();
        assert_eq!(summary.coordinate_count, 2);
        assert_eq!(summary.campaign_file, None);

        let file = dir.path().join("scan/initialize.neurite_type=all").join(MORPHOLOGY_METRICS_FILE);
        let report: MorphologyMetricsReport =
            serde_json::from_str(&std::fs::read_to_string(file).unwrap()).unwrap();
        assert_eq!(report.neurite_type, "all");
        assert_eq!(report.metrics["number_of_points"], MetricReport::Scalar(4.0));
        match &report.metrics["segment_lengths"] {
            MetricReport::Summary(Some(stats)) => assert_eq!(stats.max, 5.0),
            other => panic!("unexpected report: {other:?}"),
        }
    }

    #[test]
    fn backend_failure_is_task_error() {
        let dir = tempfile::tempdir().unwrap();
        let scan = GridScan::new(form(dir.path().join("missing.swc")), dir.path().join("scan"));
        let err = scan.execute(ExecutionMode::Run).unwrap_err();
        assert!(matches!(err, ScanError::Task { type_name: "MorphologyMetrics", .. }));
    }

    #[test]
    fn generate_is_not_implemented() {
        let dir = tempfile::tempdir().unwrap();
        let scan = GridScan::new(form(dir.path().join("cell.swc")), dir.path());
        assert!(matches!(
            scan.execute(ExecutionMode::Generate),
            Err(ScanError::NotImplemented { .. })
        ));
    }
}
