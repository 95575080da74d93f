use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Which population a report describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Global,
    Team,
    User,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Global => "global",
            Self::Team => "team",
            Self::User => "user",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsRequest {
    #[serde(default, deserialize_with = "scope_or_global")]
    pub scope: Scope,
    pub user_id: Option<String>,
    pub team_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn scope_or_global<'de, D>(deserializer: D) -> Result<Scope, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scope>::deserialize(deserializer)?.unwrap_or_default())
}

impl InsightsRequest {
    pub fn global() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsReport {
    pub scope: Scope,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "teamId")]
    pub team_id: Option<String>,
    pub reopen_rate: f64,
    pub mean_time_to_fix: f64,
    pub distributions: Distributions,
    pub clustering: ClusteringResult,
    pub generated_at: DateTime<Utc>,
}

/// Frequency tables keyed by the stringified category value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distributions {
    pub status: IndexMap<String, usize>,
    pub priority: IndexMap<String, usize>,
    pub project: IndexMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub clusters: Vec<ClusterSummary>,
    pub silhouette_score: f64,
    pub n_clusters: usize,
}

impl ClusteringResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub size: usize,
    pub top_terms: Vec<String>,
    pub defect_ids: Vec<String>,
}
