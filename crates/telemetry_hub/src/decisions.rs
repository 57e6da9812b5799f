use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::producer::Tick;

/// One endpoint-picker decision as the (out-of-scope) analytics store would
/// hand it back. The store itself is not part of this system (§3 Non-goals);
/// this trait is the seam a real implementation plugs into.
#[derive(Debug, Clone, Serialize)]
pub struct EppDecision {
    pub stack: String,
    pub endpoint: String,
    pub strategy: String,
    pub decided_at: DateTime<Utc>,
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn latest_decision(&self) -> Result<Option<EppDecision>, String>;
}

/// Emits only when a strictly newer decision appears in the store, giving
/// "at most once per change" semantics and preventing rebroadcast loops when
/// the store is quiet (§4.5 "Endpoint-picker decision producer").
pub struct EppDecisionProducer<S> {
    store: S,
    last_emitted: Option<DateTime<Utc>>,
}

impl<S: AnalyticsStore> EppDecisionProducer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            last_emitted: None,
        }
    }

    pub async fn tick(&mut self) -> Result<Tick, String> {
        let Some(decision) = self.store.latest_decision().await? else {
            return Ok(Tick::Skip);
        };

        if self.last_emitted.is_some_and(|last| decision.decided_at <= last) {
            return Ok(Tick::Skip);
        }

        self.last_emitted = Some(decision.decided_at);
        Ok(Tick::Emit(serde_json::to_value(decision).map_err(|e| e.to_string())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixtureStore {
        decisions: Vec<EppDecision>,
        cursor: AtomicUsize,
    }

    #[async_trait]
    impl AnalyticsStore for FixtureStore {
        async fn latest_decision(&self) -> Result<Option<EppDecision>, String> {
            let i = self.cursor.load(Ordering::Relaxed);
            Ok(self.decisions.get(i).cloned())
        }
    }

    fn decision(offset_secs: i64) -> EppDecision {
        EppDecision {
            stack: "llama-pool".to_string(),
            endpoint: "10.0.0.1:8000".to_string(),
            strategy: "least_queue".to_string(),
            decided_at: Utc::now() + chrono::Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn quiet_store_skips() {
        let store = FixtureStore { decisions: vec![], cursor: AtomicUsize::new(0) };
        let mut producer = EppDecisionProducer::new(store);
        assert!(matches!(producer.tick().await.unwrap(), Tick::Skip));
    }

    #[tokio::test]
    async fn new_decision_emits_once() {
        let store = FixtureStore { decisions: vec![decision(0)], cursor: AtomicUsize::new(0) };
        let mut producer = EppDecisionProducer::new(store);

        assert!(matches!(producer.tick().await.unwrap(), Tick::Emit(_)));
        assert!(matches!(producer.tick().await.unwrap(), Tick::Skip));
    }
}
