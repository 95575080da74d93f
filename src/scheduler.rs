use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, Utc};
use log::{error, info};
use tokio::task::JoinHandle;

use crate::error::{InsightsError, Result};
use crate::insights::InsightsRequest;
use crate::pipeline::InsightsPipeline;

/// Daily trigger for the global report, at a fixed UTC time of day.
#[derive(Debug, Clone, Copy)]
pub struct NightlySchedule {
    time: NaiveTime,
}

impl NightlySchedule {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            InsightsError::Config(format!("Invalid nightly time {hour:02}:{minute:02}"))
        })?;

        Ok(Self { time })
    }

    /// Next occurrence strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.time).and_utc();
        if today > now {
            today
        } else {
            today + Days::new(1)
        }
    }

    pub fn spawn(self, pipeline: Arc<InsightsPipeline>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = self.next_run_after(now);
                info!("Next nightly insights run at {next}");

                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                match pipeline
                    .generate_and_store(&InsightsRequest::global())
                    .await
                {
                    Ok(_) => info!("Nightly insights run completed"),
                    Err(e) => error!("Nightly insights run failed: {e}"),
                }
            }
        })
    }
}
