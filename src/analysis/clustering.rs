use log::{debug, info};

use super::kmeans::KMeans;
use super::silhouette::silhouette_score;
use super::tfidf::{vectorize, TfidfMatrix, VectorizerConfig};
use crate::backend::types::Defect;
use crate::insights::{ClusterSummary, ClusteringResult};

pub const DEFAULT_CLUSTERS: usize = 5;
const TOP_TERMS: usize = 10;

/// Group defects by the wording of their title and description.
///
/// Small or degenerate inputs never fail: they produce an empty result
/// with zero clusters and a 0.0 silhouette score.
pub fn cluster_defects(defects: &[Defect], requested: usize) -> ClusteringResult {
    if defects.is_empty() || defects.len() < requested {
        debug!(
            "Skipping clustering: {} defects for {} requested clusters",
            defects.len(),
            requested
        );
        return ClusteringResult::empty();
    }

    let documents: Vec<String> = defects.iter().map(Defect::document).collect();
    if documents.iter().all(|doc| doc.trim().is_empty()) {
        debug!("Skipping clustering: all defect texts are blank");
        return ClusteringResult::empty();
    }

    let Some(matrix) = build_matrix(&documents) else {
        return ClusteringResult::empty();
    };

    let n_clusters = requested.min(defects.len()).min(matrix.rows.len());
    if n_clusters < 2 {
        debug!("Skipping clustering: only {n_clusters} cluster possible");
        return ClusteringResult::empty();
    }

    let Some(fit) = KMeans::new(n_clusters).fit(&matrix.rows) else {
        return ClusteringResult::empty();
    };

    let silhouette = silhouette_score(&matrix.rows, &fit.labels);

    let clusters = (0..n_clusters)
        .map(|cluster_id| {
            let defect_ids: Vec<String> = defects
                .iter()
                .zip(&fit.labels)
                .filter(|(_, &label)| label == cluster_id)
                .map(|(defect, _)| defect.id.clone())
                .collect();

            ClusterSummary {
                cluster_id,
                size: defect_ids.len(),
                top_terms: top_terms(&matrix, &fit.centroids[cluster_id]),
                defect_ids,
            }
        })
        .collect();

    ClusteringResult {
        clusters,
        silhouette_score: silhouette,
        n_clusters,
    }
}

fn build_matrix(documents: &[String]) -> Option<TfidfMatrix> {
    match vectorize(documents, VectorizerConfig::PRIMARY) {
        Ok(matrix) => Some(matrix),
        Err(primary) => {
            info!("Retrying vectorization with relaxed settings: {primary}");
            vectorize(documents, VectorizerConfig::RELAXED)
                .map_err(|e| debug!("Skipping clustering: {e}"))
                .ok()
        }
    }
}

/// Highest-weighted terms of a centroid. Terms with no weight are left out.
fn top_terms(matrix: &TfidfMatrix, centroid: &[f64]) -> Vec<String> {
    let mut ranked: Vec<(usize, f64)> = centroid
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, weight)| *weight > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .take(TOP_TERMS)
        .map(|(i, _)| matrix.terms[i].clone())
        .collect()
}
