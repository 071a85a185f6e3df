use std::collections::BTreeMap;

use super::context::PoolContext;
use crate::fleet::Job;
use crate::metrics::{DurationKind, JobCountKind, MetricRecord};

/// Reduce one augmented context into metric records. Pure: no failure
/// mode, no shared state, deterministic output order.
pub fn reduce_context(ctx: &PoolContext) -> Vec<MetricRecord> {
    let mut records = agent_state_counts(ctx);
    records.extend(job_counts(ctx));
    records.extend(job_durations(ctx));
    records
}

/// One count per distinct (enabled, status) pair seen in the pool. Every
/// agent lands in exactly one bucket, so the counts sum to the agent list
/// length.
fn agent_state_counts(ctx: &PoolContext) -> Vec<MetricRecord> {
    let mut buckets: BTreeMap<(bool, String), u64> = BTreeMap::new();
    for agent in &ctx.agents {
        *buckets
            .entry((agent.enabled, agent.status.clone()))
            .or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|((enabled, status), count)| MetricRecord::AgentStateCount {
            enabled,
            status,
            pool: ctx.pool.name.clone(),
            count,
        })
        .collect()
}

fn job_counts(ctx: &PoolContext) -> Vec<MetricRecord> {
    let queued = ctx.jobs.iter().filter(|j| j.is_queued()).count() as u64;
    let total = ctx.jobs.len() as u64;

    vec![
        MetricRecord::JobCount {
            kind: JobCountKind::Queued,
            pool: ctx.pool.name.clone(),
            count: queued,
        },
        MetricRecord::JobCount {
            kind: JobCountKind::Running,
            pool: ctx.pool.name.clone(),
            count: total - queued,
        },
        MetricRecord::JobCount {
            kind: JobCountKind::Total,
            pool: ctx.pool.name.clone(),
            count: total,
        },
    ]
}

fn job_durations(ctx: &PoolContext) -> Vec<MetricRecord> {
    let finished: Vec<&Job> = ctx.jobs.iter().filter(|j| j.is_finished()).collect();

    [DurationKind::Total, DurationKind::Queue, DurationKind::Run]
        .into_iter()
        .map(|kind| MetricRecord::JobDuration {
            kind,
            pool: ctx.pool.name.clone(),
            observations: finished
                .iter()
                .filter_map(|job| interval_seconds(job, kind))
                .collect(),
        })
        .collect()
}

/// Interval for one finished job; None when the starting timestamp was
/// never reported.
fn interval_seconds(job: &Job, kind: DurationKind) -> Option<f64> {
    let finish = job.finish_time?;
    let (start, end) = match kind {
        DurationKind::Total => (job.queue_time?, finish),
        DurationKind::Queue => (job.queue_time?, job.receive_time?),
        DurationKind::Run => (job.receive_time?, finish),
    };
    Some((end - start).num_milliseconds() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{Agent, Pool};
    use chrono::{TimeZone, Utc};

    fn pool(name: &str) -> Pool {
        Pool {
            id: 1,
            name: name.to_string(),
            size: 4,
            is_hosted: false,
        }
    }

    fn agent(enabled: bool, status: &str) -> Agent {
        Agent {
            enabled,
            status: status.to_string(),
            ..Default::default()
        }
    }

    fn ts(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_agent_state_counts_partition_agents() {
        let ctx = PoolContext::new(
            pool("linux"),
            vec![
                agent(true, "online"),
                agent(true, "online"),
                agent(true, "online"),
                agent(false, "offline"),
                agent(false, "offline"),
            ],
        );

        let counts: Vec<_> = reduce_context(&ctx)
            .into_iter()
            .filter_map(|r| match r {
                MetricRecord::AgentStateCount {
                    enabled,
                    status,
                    count,
                    ..
                } => Some((enabled, status, count)),
                _ => None,
            })
            .collect();

        assert_eq!(counts.len(), 2);
        assert!(counts.contains(&(true, "online".to_string(), 3)));
        assert!(counts.contains(&(false, "offline".to_string(), 2)));

        let sum: u64 = counts.iter().map(|(_, _, c)| c).sum();
        assert_eq!(sum as usize, ctx.agents.len());
    }

    #[test]
    fn test_agent_state_buckets_keyed_by_enabled_and_status() {
        // Same status string, different enabled flag: two buckets.
        let ctx = PoolContext::new(
            pool("linux"),
            vec![agent(true, "online"), agent(false, "online")],
        );

        let count_records = reduce_context(&ctx)
            .into_iter()
            .filter(|r| matches!(r, MetricRecord::AgentStateCount { .. }))
            .count();
        assert_eq!(count_records, 2);
    }

    #[test]
    fn test_job_counts_classify_every_job_once() {
        let mut ctx = PoolContext::new(pool("linux"), Vec::new());
        ctx.jobs = vec![
            // Queued: never assigned.
            Job {
                request_id: 1,
                queue_time: Some(ts(0)),
                ..Default::default()
            },
            // Running: assigned, not finished.
            Job {
                request_id: 2,
                queue_time: Some(ts(0)),
                assign_time: Some(ts(5)),
                ..Default::default()
            },
            // Assigned and since finished: still counts as running.
            Job {
                request_id: 3,
                queue_time: Some(ts(0)),
                assign_time: Some(ts(5)),
                receive_time: Some(ts(10)),
                finish_time: Some(ts(70)),
                ..Default::default()
            },
        ];

        let counts: Vec<_> = reduce_context(&ctx)
            .into_iter()
            .filter_map(|r| match r {
                MetricRecord::JobCount { kind, count, .. } => Some((kind, count)),
                _ => None,
            })
            .collect();

        assert!(counts.contains(&(JobCountKind::Queued, 1)));
        assert!(counts.contains(&(JobCountKind::Running, 2)));
        assert!(counts.contains(&(JobCountKind::Total, 3)));
    }

    #[test]
    fn test_job_durations_only_for_finished_jobs() {
        let mut ctx = PoolContext::new(pool("linux"), Vec::new());
        ctx.jobs = vec![
            Job {
                request_id: 1,
                queue_time: Some(ts(0)),
                ..Default::default()
            },
            Job {
                request_id: 2,
                queue_time: Some(ts(0)),
                assign_time: Some(ts(2)),
                receive_time: Some(ts(10)),
                finish_time: Some(ts(70)),
                ..Default::default()
            },
        ];

        let records = reduce_context(&ctx);
        let durations: Vec<_> = records
            .iter()
            .filter_map(|r| match r {
                MetricRecord::JobDuration {
                    kind, observations, ..
                } => Some((*kind, observations.clone())),
                _ => None,
            })
            .collect();

        assert_eq!(durations.len(), 3);
        for (kind, observations) in durations {
            assert_eq!(observations.len(), 1, "one finished job per {kind:?}");
            let expected = match kind {
                DurationKind::Total => 70.0,
                DurationKind::Queue => 10.0,
                DurationKind::Run => 60.0,
            };
            assert_eq!(observations[0], expected);
        }
    }

    #[test]
    fn test_job_duration_skipped_when_start_missing() {
        let mut ctx = PoolContext::new(pool("linux"), Vec::new());
        // Finished but the service never reported a receive time.
        ctx.jobs = vec![Job {
            request_id: 1,
            queue_time: Some(ts(0)),
            assign_time: Some(ts(2)),
            finish_time: Some(ts(70)),
            ..Default::default()
        }];

        for record in reduce_context(&ctx) {
            if let MetricRecord::JobDuration {
                kind, observations, ..
            } = record
            {
                match kind {
                    DurationKind::Total => assert_eq!(observations, vec![70.0]),
                    DurationKind::Queue | DurationKind::Run => assert!(observations.is_empty()),
                }
            }
        }
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let mut ctx = PoolContext::new(
            pool("linux"),
            vec![
                agent(true, "online"),
                agent(false, "offline"),
                agent(true, "busy"),
            ],
        );
        ctx.jobs = vec![Job {
            request_id: 9,
            queue_time: Some(ts(0)),
            assign_time: Some(ts(1)),
            receive_time: Some(ts(3)),
            finish_time: Some(ts(33)),
            ..Default::default()
        }];

        assert_eq!(reduce_context(&ctx), reduce_context(&ctx));
    }

    #[test]
    fn test_empty_context_yields_zero_counts() {
        let ctx = PoolContext::new(pool("linux"), Vec::new());
        let records = reduce_context(&ctx);

        assert!(!records
            .iter()
            .any(|r| matches!(r, MetricRecord::AgentStateCount { .. })));
        assert!(records.iter().any(|r| matches!(
            r,
            MetricRecord::JobCount {
                kind: JobCountKind::Total,
                count: 0,
                ..
            }
        )));
    }
}
