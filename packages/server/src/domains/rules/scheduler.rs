//! Schedule ownership for periodic rules, using tokio-cron-scheduler.
//!
//! Every active periodic rule owns exactly one recurring job registration;
//! its id is stored on the rule as the schedule handle. Deactivating a rule
//! or switching it away from periodic releases the registration. `sync`
//! reconciles the scheduler with the current rule set and is safe to call
//! after any rule change.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::engine::{RuleEngine, RuleError};
use crate::common::RuleId;

pub struct RuleScheduler {
    scheduler: JobScheduler,
    engine: Arc<RuleEngine>,
    /// Cron expression every periodic rule ticks on (deployment config,
    /// default daily)
    tick_cron: String,
}

impl RuleScheduler {
    /// Create and start the underlying scheduler.
    pub async fn start(engine: Arc<RuleEngine>, tick_cron: impl Into<String>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        Ok(Self {
            scheduler,
            engine,
            tick_cron: tick_cron.into(),
        })
    }

    /// Reconcile schedule registrations with the rule set: register active
    /// periodic rules that have no handle yet, release handles of rules
    /// that are no longer schedulable.
    pub async fn sync(&self) -> Result<()> {
        for rule in self.engine.rules() {
            let schedulable = rule.active
                && rule.apply_on == super::models::ApplyOn::Periodic;
            match (schedulable, rule.schedule_handle) {
                (true, None) => {
                    let handle = self.register(rule.id).await?;
                    self.engine.set_schedule_handle(rule.id, Some(handle))?;
                    info!(rule = %rule.name, %handle, "periodic rule scheduled");
                }
                (false, Some(handle)) => {
                    self.scheduler.remove(&handle).await?;
                    self.engine.set_schedule_handle(rule.id, None)?;
                    info!(rule = %rule.name, %handle, "periodic rule schedule released");
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Release a rule's schedule registration, if it holds one.
    pub async fn release(&self, rule_id: RuleId) -> Result<()> {
        if let Some(rule) = self.engine.rule(rule_id) {
            if let Some(handle) = rule.schedule_handle {
                self.scheduler.remove(&handle).await?;
                self.engine.set_schedule_handle(rule_id, None)?;
                info!(rule = %rule.name, "periodic rule schedule released");
            }
        }
        Ok(())
    }

    async fn register(&self, rule_id: RuleId) -> Result<Uuid> {
        let engine = self.engine.clone();
        let job = Job::new_async(self.tick_cron.as_str(), move |_uuid, _lock| {
            let engine = engine.clone();
            Box::pin(async move {
                match engine.run_tick(rule_id, Utc::now()) {
                    Ok(report) => {
                        info!(
                            rule = %rule_id,
                            applied = report.applied,
                            "scheduled rule tick complete"
                        );
                    }
                    Err(RuleError::TickAlreadyRunning(_)) => {
                        warn!(rule = %rule_id, "previous tick still running, skipping");
                    }
                    Err(e) => {
                        error!(rule = %rule_id, error = %e, "scheduled rule tick failed");
                    }
                }
            })
        })?;

        let handle = job.guid();
        self.scheduler.add(job).await?;
        Ok(handle)
    }
}
