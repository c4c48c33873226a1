// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process webhook event queue.
//!
//! The HTTP handler pushes raw payloads onto a bounded channel and returns
//! immediately. A single [`EventWorker`] owns the receiver and applies events
//! one at a time, in arrival order. Every dequeued payload gets an inbox audit
//! row before processing. Failures are retried with exponential backoff and
//! then parked in an in-memory dead-letter ring.

use crate::config::Config;
use crate::db::SheetsDb;
use crate::models::{InboxRow, WebhookEvent};
use crate::services::ActivitySync;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// A payload waiting to be processed.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    pub received_at: DateTime<Utc>,
    pub payload: Value,
}

/// An event that was given up on.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub received_at: String,
    pub failed_at: String,
    pub attempts: u32,
    pub reason: String,
    pub payload: Value,
}

/// Bounded ring of dead letters; the oldest entry is dropped when full.
#[derive(Clone)]
pub struct DeadLetters {
    entries: Arc<Mutex<VecDeque<DeadLetter>>>,
    capacity: usize,
}

impl DeadLetters {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut VecDeque<DeadLetter>) -> R) -> R {
        let mut guard = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn push(&self, letter: DeadLetter) {
        tracing::error!(
            attempts = letter.attempts,
            reason = %letter.reason,
            payload = %letter.payload,
            "Event moved to dead-letter list"
        );
        self.with_entries(|entries| {
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(letter);
        });
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.with_entries(|entries| entries.iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Producer side of the queue, cloned into the router state.
#[derive(Clone)]
pub struct EventQueue {
    sender: mpsc::Sender<QueuedEvent>,
    dead_letters: DeadLetters,
}

impl EventQueue {
    /// Push a payload without waiting. A full or closed channel dead-letters
    /// the payload instead.
    pub fn enqueue(&self, payload: Value) {
        let event = QueuedEvent {
            received_at: Utc::now(),
            payload,
        };

        if let Err(e) = self.sender.try_send(event) {
            let (reason, event) = match e {
                mpsc::error::TrySendError::Full(ev) => ("queue full", ev),
                mpsc::error::TrySendError::Closed(ev) => ("queue closed", ev),
            };
            self.dead_letters.push(DeadLetter {
                received_at: format_utc_rfc3339(event.received_at),
                failed_at: format_utc_rfc3339(Utc::now()),
                attempts: 0,
                reason: reason.to_string(),
                payload: event.payload,
            });
        }
    }

    /// Events waiting for the worker.
    pub fn depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn dead_letters(&self) -> &DeadLetters {
        &self.dead_letters
    }
}

/// Create the queue and the receiver to hand to [`EventWorker::new`].
pub fn channel(capacity: usize, dead_letter_capacity: usize) -> (EventQueue, mpsc::Receiver<QueuedEvent>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let queue = EventQueue {
        sender,
        dead_letters: DeadLetters::new(dead_letter_capacity),
    };
    (queue, receiver)
}

/// Retry limits for a failing event.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.queue_max_attempts.max(1),
            base_backoff: Duration::from_millis(config.queue_retry_backoff_ms),
        }
    }

    /// Delay after failed attempt `attempt` (1-based): base * 2^(attempt-1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(factor)
    }
}

/// Counts from one [`EventWorker::drain`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Events applied successfully
    pub processed: usize,
    /// Events that failed every attempt
    pub failed: usize,
    /// Events moved to the dead-letter list (failed plus unparseable)
    pub dead_lettered: usize,
}

enum EventResult {
    Processed,
    Failed,
    Unparseable,
}

/// Consumer side of the queue.
pub struct EventWorker {
    receiver: mpsc::Receiver<QueuedEvent>,
    sync: ActivitySync,
    db: SheetsDb,
    policy: RetryPolicy,
    dead_letters: DeadLetters,
}

impl EventWorker {
    pub fn new(
        receiver: mpsc::Receiver<QueuedEvent>,
        queue: &EventQueue,
        sync: ActivitySync,
        db: SheetsDb,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            receiver,
            sync,
            db,
            policy,
            dead_letters: queue.dead_letters.clone(),
        }
    }

    /// Process events until every sender is dropped.
    pub async fn run(mut self) {
        tracing::info!(max_attempts = self.policy.max_attempts, "Event worker started");
        while let Some(event) = self.receiver.recv().await {
            self.process(event).await;
        }
        tracing::info!("Event worker stopped");
    }

    /// Process everything currently queued, then return.
    pub async fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        while let Ok(event) = self.receiver.try_recv() {
            match self.process(event).await {
                EventResult::Processed => report.processed += 1,
                EventResult::Failed => {
                    report.failed += 1;
                    report.dead_lettered += 1;
                }
                EventResult::Unparseable => report.dead_lettered += 1,
            }
        }
        report
    }

    async fn process(&self, queued: QueuedEvent) -> EventResult {
        let received_at = format_utc_rfc3339(queued.received_at);

        let audit = InboxRow {
            received_at: received_at.clone(),
            raw: queued.payload.clone(),
        };
        if let Err(e) = self.db.append_inbox(&audit).await {
            tracing::error!(error = %e, "Failed to write inbox row");
        }

        let event: WebhookEvent = match serde_json::from_value(queued.payload.clone()) {
            Ok(event) => event,
            Err(e) => {
                self.dead_letters.push(DeadLetter {
                    received_at,
                    failed_at: format_utc_rfc3339(Utc::now()),
                    attempts: 0,
                    reason: format!("Unparseable webhook payload: {}", e),
                    payload: queued.payload,
                });
                return EventResult::Unparseable;
            }
        };

        let mut last_error = String::new();
        for attempt in 1..=self.policy.max_attempts {
            match self.sync.handle(&event).await {
                Ok(outcome) => {
                    tracing::info!(
                        activity_id = event.object_id,
                        athlete_id = event.owner_id,
                        aspect_type = %event.aspect_type,
                        attempt,
                        outcome = ?outcome,
                        "Event processed"
                    );
                    return EventResult::Processed;
                }
                Err(e) => {
                    tracing::warn!(
                        activity_id = event.object_id,
                        aspect_type = %event.aspect_type,
                        attempt,
                        error = %e,
                        "Event processing failed"
                    );
                    last_error = e.to_string();
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
            }
        }

        self.dead_letters.push(DeadLetter {
            received_at,
            failed_at: format_utc_rfc3339(Utc::now()),
            attempts: self.policy.max_attempts,
            reason: last_error,
            payload: queued.payload,
        });
        EventResult::Failed
    }
}
