use prometheus::{Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

use super::{DurationKind, JobCountKind, MetricRecord};
use crate::errors::ExporterError;

/// Metric families built fresh for every scrape, so a pool or server that
/// disappears between cycles does not leave stale samples behind. Every
/// family carries a `name` label identifying the originating server.
pub struct ScrapeFamilies {
    registry: Registry,
    agents_total: GaugeVec,
    queued_jobs: GaugeVec,
    running_jobs: GaugeVec,
    total_jobs: GaugeVec,
    job_total_seconds: HistogramVec,
    job_queue_seconds: HistogramVec,
    job_running_seconds: HistogramVec,
    scrape_duration: GaugeVec,
}

impl ScrapeFamilies {
    pub fn new() -> Result<Self, ExporterError> {
        let registry = Registry::new();

        let agents_total = GaugeVec::new(
            Opts::new("build_agents_total", "Total of installed build agents"),
            &["name", "enabled", "status", "pool"],
        )?;
        let queued_jobs = GaugeVec::new(
            Opts::new("pool_queued_jobs", "Total of queued jobs for pool"),
            &["name", "pool"],
        )?;
        let running_jobs = GaugeVec::new(
            Opts::new("pool_running_jobs", "Total of running jobs for pool"),
            &["name", "pool"],
        )?;
        let total_jobs = GaugeVec::new(
            Opts::new("pool_total_jobs", "Total of jobs for pool"),
            &["name", "pool"],
        )?;
        let job_total_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pool_job_total_length_seconds",
                "Total length of job duration for pool",
            )
            .buckets(duration_buckets()),
            &["name", "pool"],
        )?;
        let job_queue_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pool_job_queue_length_seconds",
                "Total length of queue duration for pool",
            )
            .buckets(queue_buckets()),
            &["name", "pool"],
        )?;
        let job_running_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pool_job_running_length_seconds",
                "Total length of running duration for pool",
            )
            .buckets(duration_buckets()),
            &["name", "pool"],
        )?;
        let scrape_duration = GaugeVec::new(
            Opts::new(
                "build_agents_total_scrape_duration_seconds",
                "Duration of time it took to scrape total of installed build agents",
            ),
            &["name"],
        )?;

        registry.register(Box::new(agents_total.clone()))?;
        registry.register(Box::new(queued_jobs.clone()))?;
        registry.register(Box::new(running_jobs.clone()))?;
        registry.register(Box::new(total_jobs.clone()))?;
        registry.register(Box::new(job_total_seconds.clone()))?;
        registry.register(Box::new(job_queue_seconds.clone()))?;
        registry.register(Box::new(job_running_seconds.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;

        Ok(Self {
            registry,
            agents_total,
            queued_jobs,
            running_jobs,
            total_jobs,
            job_total_seconds,
            job_queue_seconds,
            job_running_seconds,
            scrape_duration,
        })
    }

    /// Materialize one record under the given server name.
    pub fn record(&self, server: &str, record: &MetricRecord) {
        match record {
            MetricRecord::AgentStateCount {
                enabled,
                status,
                pool,
                count,
            } => {
                let enabled = if *enabled { "true" } else { "false" };
                self.agents_total
                    .with_label_values(&[server, enabled, status, pool])
                    .set(*count as f64);
            }
            MetricRecord::JobCount { kind, pool, count } => {
                let gauge = match kind {
                    JobCountKind::Queued => &self.queued_jobs,
                    JobCountKind::Running => &self.running_jobs,
                    JobCountKind::Total => &self.total_jobs,
                };
                gauge.with_label_values(&[server, pool]).set(*count as f64);
            }
            MetricRecord::JobDuration {
                kind,
                pool,
                observations,
            } => {
                let family = match kind {
                    DurationKind::Total => &self.job_total_seconds,
                    DurationKind::Queue => &self.job_queue_seconds,
                    DurationKind::Run => &self.job_running_seconds,
                };
                let histogram = family.with_label_values(&[server, pool]);
                for seconds in observations {
                    histogram.observe(*seconds);
                }
            }
        }
    }

    /// Always recorded, suppressed cycle or not: operators should see the
    /// wall-clock cost of the most recent cycle even when fleet data
    /// could not be produced.
    pub fn record_cycle_duration(&self, server: &str, seconds: f64) {
        self.scrape_duration
            .with_label_values(&[server])
            .set(seconds);
    }

    /// Encode every populated family in the Prometheus text format.
    pub fn encode(&self) -> Result<String, ExporterError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| ExporterError::Internal(format!("Metrics output was not UTF-8: {e}")))
    }
}

/// Piecewise linear buckets for total and running job durations: fine
/// steps for short jobs, coarse steps out to the multi-hour tail.
fn duration_buckets() -> Vec<f64> {
    let mut buckets = Vec::new();
    let mut edge = 0.0;
    for (gap, count) in [(15.0, 8), (30.0, 10), (60.0, 28), (300.0, 11)] {
        for _ in 0..count {
            edge += gap;
            buckets.push(edge);
        }
    }
    buckets
}

/// Exponential buckets for queue wait: 1s doubling up to 512s.
fn queue_buckets() -> Vec<f64> {
    (0..10).map(|i| f64::from(1u32 << i)).collect()
}
