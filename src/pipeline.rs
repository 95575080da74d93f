use chrono::Utc;
use log::{error, info};

use crate::analysis::{
    calculate_distributions, calculate_mean_time_to_fix, calculate_reopen_rate, cluster_defects,
};
use crate::backend::{DefectFilter, DefectSnapshot, DefectTracker};
use crate::error::Result;
use crate::insights::{InsightsReport, InsightsRequest};

/// Result of the best-effort attempt to persist a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct GeneratedInsights {
    pub report: InsightsReport,
    pub storage: StoreOutcome,
}

pub struct InsightsPipeline {
    tracker: DefectTracker,
    n_clusters: usize,
}

impl InsightsPipeline {
    pub fn new(tracker: DefectTracker, n_clusters: usize) -> Self {
        Self {
            tracker,
            n_clusters,
        }
    }

    /// Fetch the defects selected by `request` and compute every insight
    /// over them. Only a failed defect-list fetch is an error.
    pub async fn generate(&self, request: &InsightsRequest) -> Result<InsightsReport> {
        info!("Generating {} insights", request.scope);

        let filter = DefectFilter {
            assigned_to_id: request.user_id.clone(),
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
        };
        let snapshot = self.tracker.snapshot(&filter).await?;

        Ok(build_report(request, &snapshot, self.n_clusters))
    }

    /// Persist a report. Failures are logged and reported, never raised.
    pub async fn store(&self, report: &InsightsReport) -> StoreOutcome {
        match self.tracker.client.store_report(report).await {
            Ok(()) => {
                info!("Stored {} insights", report.scope);
                StoreOutcome::Stored
            }
            Err(e) => {
                error!("Failed to store {} insights: {e}", report.scope);
                StoreOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn generate_and_store(&self, request: &InsightsRequest) -> Result<GeneratedInsights> {
        let report = self.generate(request).await?;
        let storage = self.store(&report).await;

        Ok(GeneratedInsights { report, storage })
    }
}

pub fn build_report(
    request: &InsightsRequest,
    snapshot: &DefectSnapshot,
    n_clusters: usize,
) -> InsightsReport {
    let DefectSnapshot { defects, events } = snapshot;

    InsightsReport {
        scope: request.scope,
        user_id: request.user_id.clone(),
        team_id: request.team_id.clone(),
        reopen_rate: calculate_reopen_rate(defects, events),
        mean_time_to_fix: calculate_mean_time_to_fix(defects, events),
        distributions: calculate_distributions(defects),
        clustering: cluster_defects(defects, n_clusters),
        generated_at: Utc::now(),
    }
}
