use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::DEFAULT_CLUSTERS;
use crate::auth::Token;
use crate::backend::DefectTracker;
use crate::insights::{InsightsRequest, Scope};
use crate::pipeline::{InsightsPipeline, StoreOutcome};
use crate::scheduler::NightlySchedule;
use crate::server;

#[derive(Parser)]
#[command(name = "defect-insights")]
#[command(author, version, about = "Defect analytics service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Args)]
struct BackendArgs {
    /// Defect tracker base URL
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:3000", global = true)]
    backend_url: String,

    /// Bearer API key for the defect tracker (optional)
    #[arg(long, env = "BACKEND_API_KEY", global = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "BACKEND_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Number of topic clusters to request
    #[arg(long, default_value_t = DEFAULT_CLUSTERS, global = true)]
    clusters: usize,

    /// Concurrent per-defect audit fetches
    #[arg(long, default_value_t = 1, global = true)]
    audit_concurrency: usize,
}

impl BackendArgs {
    fn pipeline(&self) -> Result<InsightsPipeline> {
        let tracker = DefectTracker::new(
            &self.backend_url,
            Token::from_optional(self.api_key.as_deref()),
            Duration::from_secs(self.timeout_secs),
            self.audit_concurrency,
        )?;

        Ok(InsightsPipeline::new(tracker, self.clusters))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service with the nightly schedule
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(long, env = "PORT", default_value_t = 8000)]
        port: u16,

        /// Hour of the nightly run (UTC)
        #[arg(long, default_value_t = 2)]
        nightly_hour: u32,

        /// Minute of the nightly run (UTC)
        #[arg(long, default_value_t = 0)]
        nightly_minute: u32,

        /// Disable the nightly run
        #[arg(long, default_value_t = false)]
        no_schedule: bool,
    },

    /// Generate a single report and print it
    Generate {
        #[arg(long, value_enum, default_value_t = Scope::Global)]
        scope: Scope,

        /// Restrict to defects assigned to this user
        #[arg(long)]
        user_id: Option<String>,

        /// Team label recorded in the report
        #[arg(long)]
        team_id: Option<String>,

        #[arg(long)]
        start_date: Option<String>,

        #[arg(long)]
        end_date: Option<String>,

        /// Also store the report in the backend
        #[arg(long, default_value_t = false)]
        store: bool,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty print JSON output
        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let pipeline = self.backend.pipeline()?;

        match &self.command {
            Commands::Serve {
                host,
                port,
                nightly_hour,
                nightly_minute,
                no_schedule,
            } => {
                let pipeline = Arc::new(pipeline);

                if *no_schedule {
                    info!("Nightly schedule disabled");
                } else {
                    NightlySchedule::new(*nightly_hour, *nightly_minute)?
                        .spawn(Arc::clone(&pipeline));
                }

                server::run(pipeline, host, *port).await?;
                Ok(())
            }
            Commands::Generate {
                scope,
                user_id,
                team_id,
                start_date,
                end_date,
                store,
                output,
                pretty,
            } => {
                let request = InsightsRequest {
                    scope: *scope,
                    user_id: user_id.clone(),
                    team_id: team_id.clone(),
                    start_date: start_date.clone(),
                    end_date: end_date.clone(),
                };

                let report = pipeline.generate(&request).await?;
                if *store {
                    if let StoreOutcome::Failed(reason) = pipeline.store(&report).await {
                        warn!("Report was not stored: {reason}");
                    }
                }

                let json_output = if *pretty {
                    serde_json::to_string_pretty(&report)?
                } else {
                    serde_json::to_string(&report)?
                };

                if let Some(output_path) = output {
                    std::fs::write(output_path, json_output)?;
                    info!("Insights written to: {}", output_path.display());
                } else {
                    println!("{json_output}");
                }

                Ok(())
            }
        }
    }
}
