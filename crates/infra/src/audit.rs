//! Audit sinks.
//!
//! `AuditSink::record` is synchronous and must not fail the caller, so every
//! sink here is best-effort. Delivery failures are logged and dropped.

use std::sync::Mutex;

use tokio::sync::mpsc;

use orgguard_auth::{AuditEvent, AuditOutcome, AuditSink};

/// Sender half of the audit outbox.
///
/// Events are queued on an unbounded channel; a background task drains the
/// matching [`AuditOutbox`] and persists them wherever durable audit lives.
#[derive(Debug, Clone)]
pub struct OutboxAuditSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

/// Receiver half of the audit outbox.
#[derive(Debug)]
pub struct AuditOutbox {
    rx: mpsc::UnboundedReceiver<AuditEvent>,
}

impl OutboxAuditSink {
    pub fn channel() -> (Self, AuditOutbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, AuditOutbox { rx })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl AuditSink for OutboxAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
            tracing::warn!(
                event_id = %event.event_id,
                correlation_id = %event.correlation_id,
                "audit outbox closed; dropping event"
            );
        }
    }
}

impl AuditOutbox {
    /// Wait for the next event; `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<AuditEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AuditEvent> {
        self.rx.try_recv().ok()
    }

    /// Take everything currently queued without waiting.
    pub fn drain(&mut self) -> Vec<AuditEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Writes each event as a structured log line under the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let action = event.action.as_deref().unwrap_or("");
        let resource_type = event.resource_type.as_deref().unwrap_or("");

        match event.outcome {
            AuditOutcome::Allowed => tracing::info!(
                target: "audit",
                event_id = %event.event_id,
                org_id = %event.org_id,
                user_id = %event.user_id,
                correlation_id = %event.correlation_id,
                action,
                resource_type,
                "authorization allowed"
            ),
            AuditOutcome::Denied => tracing::info!(
                target: "audit",
                event_id = %event.event_id,
                org_id = %event.org_id,
                user_id = %event.user_id,
                correlation_id = %event.correlation_id,
                action,
                resource_type,
                error_kind = ?event.error_kind,
                "authorization denied"
            ),
        }
    }
}

/// Collects events in memory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgguard_auth::AuthzErrorKind;
    use orgguard_core::{CorrelationId, OrgId, UserId};

    fn event() -> AuditEvent {
        AuditEvent::allowed(OrgId::new(), UserId::new(), CorrelationId::new())
    }

    #[tokio::test]
    async fn outbox_delivers_in_order() {
        let (sink, mut outbox) = OutboxAuditSink::channel();
        let first = event();
        let second = AuditEvent::denied(OrgId::new(), UserId::new(), CorrelationId::new(), AuthzErrorKind::RbacDenied);

        sink.record(first.clone());
        sink.record(second.clone());

        assert_eq!(outbox.recv().await, Some(first));
        assert_eq!(outbox.drain(), vec![second]);
        assert!(outbox.try_recv().is_none());
    }

    #[tokio::test]
    async fn outbox_ends_when_senders_drop() {
        let (sink, mut outbox) = OutboxAuditSink::channel();
        sink.record(event());
        drop(sink);

        assert!(outbox.recv().await.is_some());
        assert!(outbox.recv().await.is_none());
    }

    #[test]
    fn closed_outbox_does_not_panic() {
        let (sink, outbox) = OutboxAuditSink::channel();
        drop(outbox);

        assert!(sink.is_closed());
        sink.record(event());
    }

    #[test]
    fn in_memory_sink_collects_and_clears() {
        let sink = InMemoryAuditSink::new();
        sink.record(event());
        sink.record(event());
        assert_eq!(sink.events().len(), 2);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn tracing_sink_accepts_both_outcomes() {
        let sink = TracingAuditSink;
        sink.record(event());
        sink.record(AuditEvent::denied(
            OrgId::new(),
            UserId::new(),
            CorrelationId::new(),
            AuthzErrorKind::AbacDenied,
        ));
    }
}
