use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::metrics::MetricRecord;

/// Drain the cycle's entire record stream before releasing any of it. The
/// channel closes only after every upstream worker has finished, so the
/// failure flag is final by the time the drain completes; a tainted cycle
/// releases nothing.
pub async fn buffer_records(
    mut rx: mpsc::UnboundedReceiver<MetricRecord>,
    failed: Arc<AtomicBool>,
    server: &str,
) -> Vec<MetricRecord> {
    let mut held = Vec::new();
    while let Some(record) = rx.recv().await {
        held.push(record);
    }

    if failed.load(Ordering::SeqCst) {
        error!(server, "Metrics not being exposed due to previous error");
        return Vec::new();
    }

    info!(
        server,
        records = held.len(),
        "No errors detected collecting metrics, exposing metrics"
    );
    held
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::JobCountKind;

    fn sample_record(count: u64) -> MetricRecord {
        MetricRecord::JobCount {
            kind: JobCountKind::Total,
            pool: "linux".into(),
            count,
        }
    }

    #[tokio::test]
    async fn test_gate_releases_records_on_clean_cycle() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(sample_record(1)).unwrap();
        tx.send(sample_record(2)).unwrap();
        drop(tx);

        let released = buffer_records(rx, Arc::new(AtomicBool::new(false)), "primary").await;
        assert_eq!(released.len(), 2);
    }

    #[tokio::test]
    async fn test_gate_suppresses_everything_on_failure() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(sample_record(1)).unwrap();
        tx.send(sample_record(2)).unwrap();
        drop(tx);

        let released = buffer_records(rx, Arc::new(AtomicBool::new(true)), "primary").await;
        assert!(released.is_empty());
    }

    #[tokio::test]
    async fn test_gate_drains_before_deciding() {
        let (tx, rx) = mpsc::unbounded_channel();
        let failed = Arc::new(AtomicBool::new(false));

        // Failure flag flips while records are still in flight, as when a
        // slow worker fails after its siblings already produced output.
        let failed_clone = failed.clone();
        let producer = tokio::spawn(async move {
            tx.send(sample_record(1)).unwrap();
            tokio::task::yield_now().await;
            failed_clone.store(true, Ordering::SeqCst);
            tx.send(sample_record(2)).unwrap();
        });

        let released = buffer_records(rx, failed, "primary").await;
        producer.await.unwrap();
        assert!(released.is_empty());
    }

    #[tokio::test]
    async fn test_gate_handles_empty_stream() {
        let (tx, rx) = mpsc::unbounded_channel::<MetricRecord>();
        drop(tx);

        let released = buffer_records(rx, Arc::new(AtomicBool::new(false)), "primary").await;
        assert!(released.is_empty());
    }
}
