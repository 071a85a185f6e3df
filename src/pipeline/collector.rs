use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::context::PoolContext;
use super::gate;
use super::reduce;
use crate::errors::ExporterError;
use crate::fleet::{FleetClient, Pool};
use crate::metrics::MetricRecord;

/// Runs one collection cycle per scrape for a single configured server:
/// pool list, concurrent per-pool agent fetch, sequential job
/// augmentation, reduction, and the publish gate.
pub struct FleetCollector {
    client: Arc<dyn FleetClient>,
    server: String,
    exclude_hosted: bool,
    max_concurrent_fetches: Option<usize>,
    cycle_timeout: Option<Duration>,
}

/// Outcome of a completed (possibly suppressed) cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub records: Vec<MetricRecord>,
    pub duration: Duration,
    pub suppressed: bool,
}

impl FleetCollector {
    pub fn new(client: Arc<dyn FleetClient>, server: impl Into<String>) -> Self {
        Self {
            client,
            server: server.into(),
            exclude_hosted: true,
            max_concurrent_fetches: None,
            cycle_timeout: None,
        }
    }

    pub fn with_exclude_hosted(mut self, exclude_hosted: bool) -> Self {
        self.exclude_hosted = exclude_hosted;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }

    pub fn with_cycle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.cycle_timeout = timeout;
        self
    }

    pub fn server_name(&self) -> &str {
        &self.server
    }

    /// Run one full cycle. A pool-list failure aborts the whole cycle:
    /// the caller publishes nothing for this server, not even duration.
    /// Any other failure yields a report, possibly suppressed.
    pub async fn collect(&self) -> Result<CycleReport, ExporterError> {
        let start = Instant::now();

        let pools = match self.client.pools(self.exclude_hosted).await {
            Ok(pools) => pools,
            Err(e) => {
                error!(server = %self.server, error = %e, "Scrape failed, could not retrieve pools");
                return Err(e);
            }
        };
        debug!(server = %self.server, pool_count = pools.len(), "Retrieved pools");

        let cancel = CancellationToken::new();
        let deadline = self.cycle_timeout.map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                cancel.cancel();
            })
        });

        let (contexts, failed) = self.fan_out_agents(pools, cancel.clone());
        let augmented = self.augment_jobs(contexts, cancel);
        let records = reduce_records(augmented);
        let released = gate::buffer_records(records, failed.clone(), &self.server).await;

        if let Some(timer) = deadline {
            timer.abort();
        }

        Ok(CycleReport {
            records: released,
            duration: start.elapsed(),
            suppressed: failed.load(Ordering::SeqCst),
        })
    }

    /// Stage one: one worker per pool fetches that pool's agents. Workers
    /// share only the failure flag. Each worker owns a sender clone, so
    /// the output channel closes exactly when the last worker finishes.
    fn fan_out_agents(
        &self,
        pools: Vec<Pool>,
        cancel: CancellationToken,
    ) -> (mpsc::UnboundedReceiver<PoolContext>, Arc<AtomicBool>) {
        let failed = Arc::new(AtomicBool::new(false));
        let limiter = self
            .max_concurrent_fetches
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        let (tx, rx) = mpsc::unbounded_channel();

        for pool in pools {
            let client = self.client.clone();
            let server = self.server.clone();
            let failed = failed.clone();
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let fetch = async {
                    let _permit = match &limiter {
                        Some(semaphore) => semaphore.acquire().await.ok(),
                        None => None,
                    };
                    client.agents(pool.id).await
                };

                let agents = tokio::select! {
                    _ = cancel.cancelled() => {
                        failed.store(true, Ordering::SeqCst);
                        error!(server = %server, pool_id = pool.id, "Cycle deadline reached before agents were retrieved");
                        Vec::new()
                    }
                    result = fetch => match result {
                        Ok(agents) => {
                            debug!(server = %server, pool_id = pool.id, agent_count = agents.len(), "Retrieved agents for pool");
                            agents
                        }
                        Err(e) => {
                            failed.store(true, Ordering::SeqCst);
                            error!(server = %server, pool_id = pool.id, error = %e, "Failed to retrieve agents for pool");
                            Vec::new()
                        }
                    }
                };

                let _ = tx.send(PoolContext::new(pool, agents));
            });
        }

        (rx, failed)
    }

    /// Stage two: a single consumer fetches each pool's current jobs. A
    /// failure here degrades that pool to zero jobs without tainting the
    /// cycle; missing job data is not catastrophic the way missing agent
    /// data is.
    fn augment_jobs(
        &self,
        mut rx: mpsc::UnboundedReceiver<PoolContext>,
        cancel: CancellationToken,
    ) -> mpsc::UnboundedReceiver<PoolContext> {
        let client = self.client.clone();
        let server = self.server.clone();
        let (tx, out) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(mut ctx) = rx.recv().await {
                let jobs = tokio::select! {
                    _ = cancel.cancelled() => {
                        warn!(server = %server, pool_id = ctx.pool.id, "Cycle deadline reached, treating pool as having no current jobs");
                        Vec::new()
                    }
                    result = client.current_jobs(ctx.pool.id) => match result {
                        Ok(jobs) => {
                            debug!(server = %server, pool_id = ctx.pool.id, job_count = jobs.len(), "Retrieved current jobs for pool");
                            jobs
                        }
                        Err(e) => {
                            warn!(server = %server, pool_id = ctx.pool.id, error = %e, "Failed to retrieve current jobs for pool, treating as none");
                            Vec::new()
                        }
                    }
                };

                ctx.jobs = jobs;
                let _ = tx.send(ctx);
            }
        });

        out
    }
}

/// Stage three: pure reduction of each augmented context into records.
fn reduce_records(
    mut rx: mpsc::UnboundedReceiver<PoolContext>,
) -> mpsc::UnboundedReceiver<MetricRecord> {
    let (tx, out) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(ctx) = rx.recv().await {
            for record in reduce::reduce_context(&ctx) {
                let _ = tx.send(record);
            }
        }
    });

    out
}
