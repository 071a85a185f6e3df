pub mod exposition;

pub use exposition::ScrapeFamilies;

/// Job-count flavors published per pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobCountKind {
    Queued,
    Running,
    Total,
}

/// Duration flavors observed for finished jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationKind {
    Total,
    Queue,
    Run,
}

/// One aggregated value produced by the reduction stage. Immutable once
/// produced; the exposition layer materializes these into Prometheus
/// families under the originating server's name label.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricRecord {
    AgentStateCount {
        enabled: bool,
        status: String,
        pool: String,
        count: u64,
    },
    JobCount {
        kind: JobCountKind,
        pool: String,
        count: u64,
    },
    JobDuration {
        kind: DurationKind,
        pool: String,
        observations: Vec<f64>,
    },
}
