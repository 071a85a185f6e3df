use crate::fleet::{Agent, Job, Pool};

/// Per-pool accumulator handed from stage to stage through the collection
/// pipeline. Exactly one stage owns a context at any time; the pool
/// association for agents and jobs lives here rather than on the records
/// themselves.
#[derive(Debug, Clone)]
pub struct PoolContext {
    pub pool: Pool,
    pub agents: Vec<Agent>,
    pub jobs: Vec<Job>,
}

impl PoolContext {
    pub fn new(pool: Pool, agents: Vec<Agent>) -> Self {
        Self {
            pool,
            agents,
            jobs: Vec::new(),
        }
    }
}
