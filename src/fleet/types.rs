use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Count-plus-value envelope every fleet list endpoint wraps its records in.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub count: usize,
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub is_hosted: bool,
}

/// A worker registered to a pool. The pool association is carried by the
/// surrounding pipeline context, not by this record.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub status: String,
}

/// A unit of work requested against a pool. A missing timestamp means the
/// job has not reached that point yet.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub request_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub queue_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assign_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub receive_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub plan_type: String,
}

impl Job {
    /// A job with no assign time has not been picked up by an agent yet.
    pub fn is_queued(&self) -> bool {
        self.assign_time.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_envelope_deserialize() {
        let body = r#"{"count":2,"value":[
            {"id":1,"name":"Default","size":4,"isHosted":false},
            {"id":2,"name":"Hosted Ubuntu","size":10,"isHosted":true}
        ]}"#;
        let envelope: Envelope<Pool> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.count, 2);
        assert_eq!(envelope.value.len(), 2);
        assert!(envelope.value[1].is_hosted);
    }

    #[test]
    fn test_agent_deserialize() {
        let body = r#"{"id":7,"name":"agent-07","size":1,"version":"2.210.1","enabled":true,"status":"online"}"#;
        let agent: Agent = serde_json::from_str(body).unwrap();
        assert_eq!(agent.id, 7);
        assert!(agent.enabled);
        assert_eq!(agent.status, "online");
    }

    #[test]
    fn test_job_deserialize_missing_timestamps() {
        let body = r#"{"requestId":11,"name":"CI","queueTime":"2024-03-01T10:00:00Z","jobId":"a1","planType":"build"}"#;
        let job: Job = serde_json::from_str(body).unwrap();
        assert!(job.queue_time.is_some());
        assert!(job.assign_time.is_none());
        assert!(job.is_queued());
        assert!(!job.is_finished());
    }

    #[test]
    fn test_job_classification() {
        let queued = Job {
            request_id: 1,
            ..Default::default()
        };
        let running = Job {
            request_id: 2,
            assign_time: Some(Utc::now()),
            ..Default::default()
        };
        let finished = Job {
            request_id: 3,
            assign_time: Some(Utc::now()),
            finish_time: Some(Utc::now()),
            ..Default::default()
        };
        assert!(queued.is_queued());
        assert!(!running.is_queued());
        assert!(!running.is_finished());
        assert!(!finished.is_queued());
        assert!(finished.is_finished());
    }

    #[test]
    fn test_empty_envelope_deserialize() {
        let envelope: Envelope<Job> = serde_json::from_str(r#"{"count":0,"value":[]}"#).unwrap();
        assert!(envelope.value.is_empty());
    }
}
