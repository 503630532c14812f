//! # Progress Event Bus
//!
//! Per-request, single-producer/multi-consumer fan-out of [`ProgressEvent`]s.
//! Each subscriber gets its own bounded queue (default 64); a slow
//! subscriber never back-pressures the Orchestrator. On overflow the oldest
//! *non-terminal* event for that subscriber is dropped and replaced with a
//! `ProgressDropped` marker — the terminal `FinalResponse`/`Error` event is
//! never dropped, matching spec §4.10 exactly (a plain bounded broadcast
//! channel drops indiscriminately, which is why this isn't just
//! `tokio::sync::broadcast`).

use crate::models::{
    Complexity, CostBreakdown, FinalResponse, Intent, ProviderUsageSummary, RequestId,
    SelectionLogEntry, SubtaskId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const DEFAULT_BUFFER: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingAssignment {
    pub subtask_id: SubtaskId,
    pub task_kind: String,
    pub model_id: String,
    pub provider: String,
    pub reason: String,
    pub est_cost: f64,
    pub est_time_secs: f64,
    pub alternatives_considered: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrationDecisionEntry {
    pub chosen_response_id: String,
    pub reasoning: String,
    pub confidence: f64,
}

/// One non-winning candidate for a subtask that had more than one response
/// (spec §6's `arbitration_decision.conflicting_results`), kept so a caller
/// can see what was overruled rather than only the winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictingResultEntry {
    pub subtask_id: SubtaskId,
    pub response_id: String,
    pub confidence: f64,
}

/// Tagged progress payloads, mirroring spec §6's JSON event catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    ProcessingStarted,
    AnalysisComplete {
        intent: Intent,
        complexity: Complexity,
        degraded: bool,
    },
    RoutingComplete {
        assignments: Vec<RoutingAssignment>,
        total_subtasks: usize,
    },
    ExecutionProgress {
        subtask_id: SubtaskId,
        model_id: String,
        provider: String,
        success: bool,
        confidence: f64,
        cost: f64,
        execution_time_secs: f64,
        used_fallback: bool,
        primary_model_failed: Option<String>,
        fallback_reason: Option<String>,
        error_message: Option<String>,
    },
    ArbitrationDecision {
        conflicts_detected: usize,
        decisions: Vec<ArbitrationDecisionEntry>,
        conflicting_results: Vec<ConflictingResultEntry>,
    },
    SynthesisProgress {
        stage: SynthesisStage,
    },
    FinalResponse {
        response: Box<FinalResponse>,
        provider_selection_log: Vec<SelectionLogEntry>,
        provider_usage_summary: Vec<ProviderUsageSummary>,
    },
    Error {
        code: String,
        message: String,
    },
    ProgressDropped {
        dropped_count: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStage {
    Started,
    Complete,
}

impl ProgressEvent {
    /// Terminal events are the two the bus refuses to drop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::FinalResponse { .. } | ProgressEvent::Error { .. })
    }
}

/// One event on the wire: envelope + tagged payload, per spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub request_id: RequestId,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ProgressEvent,
}

/// Collaborator consumed by the Orchestrator/Executor/etc. to emit events.
/// `emit` is documented as idempotent and non-blocking from the caller's
/// point of view — the bus absorbs backpressure internally.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, envelope: Envelope);
}

/// Bounded queue shared between one subscription's producer side (the bus)
/// and consumer side (whoever called `subscribe`). A plain bounded
/// `mpsc` channel won't do here: its backpressure would make the terminal
/// "never block the producer, never drop the terminal event" guarantee
/// impossible to express without risking the producer blocking forever on
/// a consumer that never reads. A small hand-rolled ring buffer behind a
/// `Notify` sidesteps that: pushing never blocks, it only evicts.
struct SubscriberQueue {
    deque: Mutex<VecDeque<Envelope>>,
    notify: Notify,
    capacity: usize,
}

impl SubscriberQueue {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            deque: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        })
    }

    fn push(&self, envelope: Envelope) {
        let mut deque = self.deque.lock().expect("subscriber queue lock poisoned");
        if deque.len() >= self.capacity && !envelope.event.is_terminal() {
            if let Some(pos) = deque.iter().position(|queued| !queued.event.is_terminal()) {
                deque.remove(pos);
                deque.push_back(Envelope {
                    request_id: envelope.request_id,
                    ts: Utc::now(),
                    event: ProgressEvent::ProgressDropped { dropped_count: 1 },
                });
            }
            // If every buffered event happens to be terminal (at most two
            // ever exist), there's nothing safe to evict; fall through and
            // let the buffer grow by one rather than lose data.
        }
        deque.push_back(envelope);
        self.notify.notify_waiters();
    }

    async fn recv(&self) -> Option<Envelope> {
        loop {
            {
                let mut deque = self.deque.lock().expect("subscriber queue lock poisoned");
                if let Some(envelope) = deque.pop_front() {
                    return Some(envelope);
                }
            }
            self.notify.notified().await;
        }
    }
}

/// Consumer handle returned by [`ProgressBus::subscribe`].
pub struct ProgressReceiver {
    queue: Arc<SubscriberQueue>,
}

impl ProgressReceiver {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.queue.recv().await
    }

    /// Non-blocking drain of whatever is currently buffered.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.queue
            .deque
            .lock()
            .expect("subscriber queue lock poisoned")
            .pop_front()
    }
}

/// Per-request fan-out bus. One instance is owned by the Orchestrator for
/// the lifetime of a single request.
pub struct ProgressBus {
    request_id: RequestId,
    buffer: usize,
    subscribers: std::sync::Mutex<Vec<Arc<SubscriberQueue>>>,
}

impl ProgressBus {
    pub fn new(request_id: RequestId) -> Self {
        Self::with_buffer(request_id, DEFAULT_BUFFER)
    }

    pub fn with_buffer(request_id: RequestId, buffer: usize) -> Self {
        Self {
            request_id,
            buffer,
            subscribers: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Registers a new subscriber and returns its receiving half.
    pub async fn subscribe(&self) -> ProgressReceiver {
        let queue = SubscriberQueue::new(self.buffer);
        self.subscribers
            .lock()
            .expect("subscriber list lock poisoned")
            .push(queue.clone());
        ProgressReceiver { queue }
    }
}

#[async_trait]
impl ProgressSink for ProgressBus {
    async fn emit(&self, mut envelope: Envelope) {
        envelope.request_id = self.request_id;
        let subscribers = self.subscribers.lock().expect("subscriber list lock poisoned");
        for queue in subscribers.iter() {
            queue.push(envelope.clone());
        }
    }
}

/// A no-op sink, useful for tests and for embedders who don't need a
/// progress channel at all.
pub struct NullProgressSink;

#[async_trait]
impl ProgressSink for NullProgressSink {
    async fn emit(&self, _envelope: Envelope) {}
}

/// Builds an [`Envelope`] for `event`, stamping the current time. The
/// `request_id` field is a placeholder overwritten by the bus on emit.
pub fn envelope(event: ProgressEvent) -> Envelope {
    Envelope {
        request_id: RequestId::nil(),
        ts: Utc::now(),
        event,
    }
}

pub type SharedProgressSink = Arc<dyn ProgressSink>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_events_in_emission_order() {
        let bus = ProgressBus::new(RequestId::new());
        let mut rx = bus.subscribe().await;
        bus.emit(envelope(ProgressEvent::ProcessingStarted)).await;
        bus.emit(envelope(ProgressEvent::Error { code: "X".into(), message: "y".into() }))
            .await;

        let first = rx.recv().await.expect("first event");
        assert!(matches!(first.event, ProgressEvent::ProcessingStarted));
        let second = rx.recv().await.expect("second event");
        assert!(matches!(second.event, ProgressEvent::Error { .. }));
    }

    #[tokio::test]
    async fn terminal_event_is_never_dropped_under_overflow() {
        let bus = ProgressBus::with_buffer(RequestId::new(), 2);
        let mut rx = bus.subscribe().await;
        for _ in 0..10 {
            bus.emit(envelope(ProgressEvent::ProcessingStarted)).await;
        }
        bus.emit(envelope(ProgressEvent::Error { code: "X".into(), message: "boom".into() }))
            .await;

        let mut saw_terminal = false;
        while let Some(env) = rx.try_recv() {
            if env.event.is_terminal() {
                saw_terminal = true;
            }
        }
        assert!(saw_terminal, "terminal event must survive overflow eviction");
    }
}
