//! Dispatch of one completion call under a deadline.
//!
//! Each dispatch spawns a detached worker that performs the call and hands its
//! result back over a oneshot channel. The session task waits on the result,
//! the deadline and the interrupt source at once. The first to resolve wins;
//! on a tie the result is taken. A worker that loses the race keeps running
//! until its call returns, and its result is dropped.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};

use crate::client::ChatCompletion;
use crate::error::ChatError;
use crate::history::History;
use crate::interrupt::Interrupts;
use crate::progress::{self, Spinner};

#[derive(Debug)]
pub enum Outcome {
    Success(String),
    RemoteError(anyhow::Error),
    Timeout(Duration),
    Canceled,
}

/// Deadline used when the configured timeout runs past what `Instant` can hold.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Bookkeeping for the single call in flight.
struct PendingCall {
    started: Instant,
    deadline: Instant,
    turns: usize,
}

impl PendingCall {
    fn new(history: &History, timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started
                .checked_add(timeout)
                .unwrap_or_else(|| started + FAR_FUTURE),
            turns: history.len(),
        }
    }
}

pub struct Gateway<B> {
    backend: Arc<B>,
    model: String,
    timeout: Duration,
}

impl<B: ChatCompletion> Gateway<B> {
    pub fn new(backend: Arc<B>, model: String, timeout: Duration) -> Self {
        Self { backend, model, timeout }
    }

    /// Issue one completion call for the current history.
    ///
    /// `history` is only read to take the payload snapshot; the worker never
    /// sees the live log. The spinner is drawn on `w` while waiting.
    pub async fn dispatch(
        &self,
        history: &History,
        interrupts: &mut Interrupts,
        spinner: &mut Spinner,
        w: &mut impl Write,
    ) -> Outcome {
        let call = PendingCall::new(history, self.timeout);
        let rx = self.spawn_worker(history);
        self.await_outcome(call, rx, interrupts, spinner, w).await
    }

    async fn await_outcome(
        &self,
        call: PendingCall,
        mut rx: oneshot::Receiver<anyhow::Result<String>>,
        interrupts: &mut Interrupts,
        spinner: &mut Spinner,
        w: &mut impl Write,
    ) -> Outcome {
        let deadline = tokio::time::sleep_until(call.deadline);
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(progress::TICK);

        let outcome = loop {
            tokio::select! {
                biased;

                result = &mut rx => break match result {
                    Ok(Ok(text)) if text.trim().is_empty() => {
                        Outcome::RemoteError(ChatError::EmptyResponse.into())
                    }
                    Ok(Ok(text)) => Outcome::Success(text),
                    Ok(Err(e)) => Outcome::RemoteError(e),
                    Err(_) => Outcome::RemoteError(anyhow::anyhow!(
                        "completion worker stopped without a result"
                    )),
                },

                _ = &mut deadline => break Outcome::Timeout(self.timeout),

                _ = interrupts.recv() => break Outcome::Canceled,

                _ = ticker.tick() => spinner.tick(w),
            }
        };

        spinner.clear(w);
        interrupts.drain();

        let elapsed_ms = call.started.elapsed().as_millis() as u64;
        match &outcome {
            Outcome::Success(text) => {
                tracing::debug!(turns = call.turns, elapsed_ms, chars = text.len(), "completion succeeded")
            }
            Outcome::RemoteError(e) => {
                tracing::warn!(turns = call.turns, elapsed_ms, error = %e, "completion failed")
            }
            Outcome::Timeout(d) => {
                tracing::warn!(turns = call.turns, timeout_ms = d.as_millis() as u64, "completion timed out")
            }
            Outcome::Canceled => {
                tracing::info!(turns = call.turns, elapsed_ms, "completion canceled, worker detached")
            }
        }
        outcome
    }

    fn spawn_worker(&self, history: &History) -> oneshot::Receiver<anyhow::Result<String>> {
        let (tx, rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        let model = self.model.clone();
        let payload = history.snapshot();

        // Detached: the handle is dropped, so a losing worker is never aborted.
        tokio::spawn(async move {
            let result = backend.complete(&model, &payload).await;
            if tx.send(result).is_err() {
                tracing::debug!("discarding late completion result");
            }
        });
        rx
    }
}
