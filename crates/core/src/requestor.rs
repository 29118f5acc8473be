use crate::domain::analysis::{AnalysisRequest, AnalysisResult};
use crate::llm::error::{AnalysisError, ErrorKind};
use crate::llm::{json, LlmClient};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestState {
    Idle,
    Loading { ticker: String },
    Succeeded(AnalysisResult),
    Failed { kind: ErrorKind, message: String },
}

impl RequestState {
    fn failed(err: &AnalysisError) -> Self {
        Self::Failed {
            kind: err.kind,
            message: err.message(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    /// Sequence number of the request that produced `state`; 0 before any request.
    pub seq: u64,
    pub state: RequestState,
    pub updated_at: DateTime<Utc>,
}

impl StateSnapshot {
    fn new(seq: u64, state: RequestState) -> Self {
        Self {
            seq,
            state,
            updated_at: Utc::now(),
        }
    }
}

pub struct AnalysisRequestor {
    client: Arc<dyn LlmClient>,
    state: watch::Sender<StateSnapshot>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl AnalysisRequestor {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        let (state, _) = watch::channel(StateSnapshot::new(0, RequestState::Idle));
        Self {
            client,
            state,
            in_flight: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.borrow().clone()
    }

    /// Runs one analysis under the next sequence number and publishes its outcome only
    /// if no newer request started meanwhile. The caller always gets its own outcome.
    pub async fn analyze(&self, ticker: &str) -> Result<AnalysisResult, AnalysisError> {
        let request = match AnalysisRequest::try_new(ticker) {
            Ok(request) => request,
            Err(err) => {
                let seq = self.begin(RequestState::failed(&err));
                tracing::warn!(seq, "rejected blank ticker");
                return Err(err);
            }
        };

        let seq = self.begin(RequestState::Loading {
            ticker: request.ticker.clone(),
        });
        tracing::info!(
            seq,
            ticker = %request.ticker,
            provider = %self.client.provider(),
            "analysis started"
        );

        let outcome = self.run(&request).await;

        let next = match &outcome {
            Ok(result) => RequestState::Succeeded(result.clone()),
            Err(err) => RequestState::failed(err),
        };
        if self.finish(seq, next) {
            match &outcome {
                Ok(result) => tracing::info!(
                    seq,
                    ticker = %request.ticker,
                    trend = %result.trend,
                    sentiment = %result.sentiment,
                    "analysis succeeded"
                ),
                Err(err) => tracing::warn!(
                    seq,
                    ticker = %request.ticker,
                    error = %err,
                    "analysis failed"
                ),
            }
        } else {
            tracing::debug!(seq, ticker = %request.ticker, "discarding stale analysis outcome");
        }

        outcome
    }

    /// Starts an analysis in the background, aborting the previous submission if it
    /// is still running.
    pub fn submit(
        self: &Arc<Self>,
        ticker: impl Into<String>,
    ) -> JoinHandle<Result<AnalysisResult, AnalysisError>> {
        let this = Arc::clone(self);
        let ticker = ticker.into();

        let mut slot = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let handle = tokio::spawn(async move { this.analyze(&ticker).await });
        *slot = Some(handle.abort_handle());
        handle
    }

    /// Back to `Idle`. Anything still in flight can no longer publish.
    pub fn reset(&self) -> StateSnapshot {
        if let Some(previous) = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            previous.abort();
        }
        let seq = self.begin(RequestState::Idle);
        tracing::debug!(seq, "analysis state reset");
        self.snapshot()
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let output = self.client.generate(request).await?;
        match output.structured {
            Some(value) => json::parse_structured(value),
            None => json::parse_analysis(&output.text),
        }
    }

    fn begin(&self, state: RequestState) -> u64 {
        let mut seq = 0;
        self.state.send_modify(|snapshot| {
            seq = snapshot.seq + 1;
            *snapshot = StateSnapshot::new(seq, state);
        });
        seq
    }

    fn finish(&self, seq: u64, state: RequestState) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.seq != seq {
                return false;
            }
            *snapshot = StateSnapshot::new(seq, state);
            true
        })
    }
}
