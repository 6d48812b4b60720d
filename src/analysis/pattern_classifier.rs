// src/analysis/pattern_classifier.rs
//
// Partitions a historical batch into the four severity states and labels
// every observation. Cluster ids coming out of k-means carry no meaning;
// the contract callers rely on is the rank-to-label mapping re-derived
// from centroid statistics after every fit.

use super::kmeans::KMeans;
use crate::error::AnalysisError;
use crate::types::{ClusteringConfig, EnrichedObservation, PatternLabel};
use serde::Serialize;
use tracing::debug;

/// Number of severity states, and therefore clusters.
pub const PATTERN_COUNT: usize = 4;

// ============================================================================
// TYPES
// ============================================================================

/// Cluster membership for one observation: the internal cluster id plus
/// the severity label its cluster ranked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pattern {
    pub cluster_id: usize,
    pub label: PatternLabel,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabeledObservation {
    pub observation: EnrichedObservation,
    pub pattern: Pattern,
}

/// Aggregate statistics for one severity state. Derived report, built
/// fresh on every classification.
#[derive(Debug, Clone, Serialize)]
pub struct PatternStats {
    pub label: PatternLabel,
    pub observations: usize,
    pub mean_vehicle_count: f64,
    pub mean_density: f64,
    pub mean_flow_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternSummary {
    pub rows: Vec<PatternStats>,
}

impl PatternSummary {
    pub fn stats_for(&self, label: PatternLabel) -> Option<&PatternStats> {
        self.rows.iter().find(|row| row.label == label)
    }
}

/// The representative vehicle count (and tie-break density) per label,
/// in ascending severity order. This is the explicit value handed from
/// classifier to forecaster so predicted counts can be labeled with the
/// same rule the historical batch was.
#[derive(Debug, Clone, Serialize)]
pub struct CentroidTable {
    rows: Vec<CentroidRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CentroidRow {
    pub label: PatternLabel,
    pub vehicle_count: f64,
    pub density: f64,
}

impl CentroidTable {
    pub fn rows(&self) -> &[CentroidRow] {
        &self.rows
    }

    /// Nearest-centroid classification of a predicted count. Scanning in
    /// severity order with a strict comparison resolves exact ties to the
    /// less severe label.
    pub fn classify_count(&self, vehicle_count: f64) -> PatternLabel {
        let mut best = self.rows[0].label;
        let mut best_distance = f64::INFINITY;
        for row in &self.rows {
            let distance = (row.vehicle_count - vehicle_count).abs();
            if distance < best_distance {
                best = row.label;
                best_distance = distance;
            }
        }
        best
    }
}

/// Everything a classification run produces: the labeled batch, the
/// summary report, and the centroid table the forecaster trains against.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedBatch {
    pub observations: Vec<LabeledObservation>,
    pub summary: PatternSummary,
    pub centroids: CentroidTable,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct PatternClassifier {
    config: ClusteringConfig,
}

impl PatternClassifier {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn classify(
        &self,
        batch: &[EnrichedObservation],
    ) -> Result<ClassifiedBatch, AnalysisError> {
        if batch.len() < PATTERN_COUNT {
            return Err(AnalysisError::InsufficientData {
                needed: PATTERN_COUNT,
                got: batch.len(),
            });
        }

        let features = self.feature_matrix(batch);
        let mut model = KMeans::new(PATTERN_COUNT, self.config.max_iterations, self.config.seed)
            .with_restarts(self.config.restarts);
        model.fit(&features);
        debug!(
            inertia = model.inertia(),
            samples = batch.len(),
            "clustering converged"
        );

        let aggregates = aggregate_clusters(batch, model.assignments());
        let label_by_cluster = rank_clusters(&aggregates);

        let observations = batch
            .iter()
            .zip(model.assignments())
            .map(|(observation, &cluster_id)| LabeledObservation {
                observation: observation.clone(),
                pattern: Pattern {
                    cluster_id,
                    label: label_by_cluster[cluster_id],
                },
            })
            .collect();

        let mut ranked = aggregates.clone();
        ranked.sort_by_key(|aggregate| label_by_cluster[aggregate.cluster_id]);

        let summary = PatternSummary {
            rows: ranked
                .iter()
                .map(|aggregate| PatternStats {
                    label: label_by_cluster[aggregate.cluster_id],
                    observations: aggregate.members,
                    mean_vehicle_count: aggregate.mean_vehicle_count,
                    mean_density: aggregate.mean_density,
                    mean_flow_rate: aggregate.mean_flow_rate,
                })
                .collect(),
        };

        let centroids = CentroidTable {
            rows: ranked
                .iter()
                .map(|aggregate| CentroidRow {
                    label: label_by_cluster[aggregate.cluster_id],
                    vehicle_count: aggregate.mean_vehicle_count,
                    density: aggregate.mean_density,
                })
                .collect(),
        };

        Ok(ClassifiedBatch {
            observations,
            summary,
            centroids,
        })
    }

    /// Feature rows for clustering: vehicle count always, plus hour and
    /// weekday columns scaled to the count's range when enabled.
    fn feature_matrix(&self, batch: &[EnrichedObservation]) -> Vec<Vec<f64>> {
        if !self.config.use_time_features {
            return batch
                .iter()
                .map(|observation| vec![f64::from(observation.vehicle_count())])
                .collect();
        }

        let max_count = batch
            .iter()
            .map(|observation| observation.vehicle_count())
            .max()
            .unwrap_or(1)
            .max(1) as f64;

        batch
            .iter()
            .map(|observation| {
                vec![
                    f64::from(observation.vehicle_count()),
                    f64::from(observation.hour) / 23.0 * max_count,
                    f64::from(observation.day_of_week) / 6.0 * max_count,
                ]
            })
            .collect()
    }
}

// ============================================================================
// RELABELING
// ============================================================================

#[derive(Debug, Clone)]
struct ClusterAggregate {
    cluster_id: usize,
    members: usize,
    mean_vehicle_count: f64,
    mean_density: f64,
    mean_flow_rate: f64,
}

fn aggregate_clusters(
    batch: &[EnrichedObservation],
    assignments: &[usize],
) -> Vec<ClusterAggregate> {
    let mut aggregates: Vec<ClusterAggregate> = (0..PATTERN_COUNT)
        .map(|cluster_id| ClusterAggregate {
            cluster_id,
            members: 0,
            mean_vehicle_count: 0.0,
            mean_density: 0.0,
            mean_flow_rate: 0.0,
        })
        .collect();

    for (observation, &cluster_id) in batch.iter().zip(assignments) {
        let aggregate = &mut aggregates[cluster_id];
        aggregate.members += 1;
        aggregate.mean_vehicle_count += f64::from(observation.vehicle_count());
        aggregate.mean_density += observation.density();
        aggregate.mean_flow_rate += observation.flow_rate();
    }

    for aggregate in aggregates.iter_mut() {
        if aggregate.members > 0 {
            let n = aggregate.members as f64;
            aggregate.mean_vehicle_count /= n;
            aggregate.mean_density /= n;
            aggregate.mean_flow_rate /= n;
        }
    }

    aggregates
}

/// Rank clusters by ascending mean vehicle count and assign labels in that
/// order. Ties break by ascending mean density, then cluster id, so the
/// assignment is deterministic even for degenerate batches.
fn rank_clusters(aggregates: &[ClusterAggregate]) -> Vec<PatternLabel> {
    let mut order: Vec<usize> = (0..aggregates.len()).collect();
    order.sort_by(|&a, &b| {
        let left = &aggregates[a];
        let right = &aggregates[b];
        left.mean_vehicle_count
            .partial_cmp(&right.mean_vehicle_count)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                left.mean_density
                    .partial_cmp(&right.mean_density)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(left.cluster_id.cmp(&right.cluster_id))
    });

    let mut labels = vec![PatternLabel::Light; aggregates.len()];
    for (rank, &cluster_id) in order.iter().enumerate() {
        labels[cluster_id] = PatternLabel::from_rank(rank).unwrap_or(PatternLabel::Congested);
    }
    labels
}
