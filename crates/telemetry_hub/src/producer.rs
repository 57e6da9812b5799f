use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::hub::Hub;

/// Generator timeout (§4.5 "telemetry generator: 2 s").
const GENERATOR_TIMEOUT: Duration = Duration::from_secs(2);

/// What one producer invocation returned.
pub enum Tick {
    /// Broadcast this payload under the producer's topic.
    Emit(serde_json::Value),
    /// Nothing new since the last tick; skip this round.
    Skip,
}

/// A topic-bound generator driven by its own ticker (§4.5 "Producer loop").
/// The generator is a short synchronous-over-await function; any failure is
/// logged and the tick is skipped, never propagated to the hub.
pub struct Producer<G> {
    topic: String,
    interval: Duration,
    generate: G,
}

impl<G, Fut> Producer<G>
where
    G: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<Tick, String>> + Send,
{
    pub fn new(topic: impl Into<String>, interval: Duration, generate: G) -> Self {
        Self {
            topic: topic.into(),
            interval,
            generate,
        }
    }

    /// Runs until `cancel` fires. Each tick is wrapped in [`GENERATOR_TIMEOUT`];
    /// a timeout is treated the same as a generator error (§4.5).
    pub async fn run(mut self, hub: Hub, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match tokio::time::timeout(GENERATOR_TIMEOUT, (self.generate)()).await {
                        Ok(Ok(Tick::Emit(payload))) => hub.broadcast(&self.topic, payload).await,
                        Ok(Ok(Tick::Skip)) => {}
                        Ok(Err(e)) => warn!(topic = self.topic, error = %e, "producer generator failed; skipping tick"),
                        Err(_) => error!(topic = self.topic, "producer generator timed out"),
                    }
                }
            }
        }
    }
}
