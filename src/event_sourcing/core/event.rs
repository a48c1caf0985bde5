use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use anyhow::Result;

// ============================================================================
// Event Envelope - Event Metadata
// ============================================================================
//
// Wraps domain events with the metadata needed to store and replay them.
// Works with ANY event type.
//
// ============================================================================

/// Generic Event Envelope - wraps any domain event with metadata
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<E> {
    // Event Identity
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub sequence_number: i64,

    // Event Type Information
    pub event_type: String,
    pub event_version: i32,

    // Event Payload
    pub event_data: E,

    // Groups the events emitted by one request
    pub correlation_id: Uuid,

    // Who triggered this event
    pub user_id: Option<i64>,

    pub timestamp: DateTime<Utc>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn new(
        aggregate_id: Uuid,
        sequence_number: i64,
        event_data: E,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            sequence_number,
            event_type: event_data.event_type().to_string(),
            event_version: E::event_version(),
            event_data,
            correlation_id,
            user_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Wrap freshly emitted events, numbering them after `current_version`.
pub fn wrap_events<E: DomainEvent>(
    aggregate_id: Uuid,
    current_version: i64,
    events: Vec<E>,
    correlation_id: Uuid,
    user_id: Option<i64>,
) -> Vec<EventEnvelope<E>> {
    events
        .into_iter()
        .zip(current_version + 1..)
        .map(|(event, seq)| {
            let envelope = EventEnvelope::new(aggregate_id, seq, event, correlation_id);
            match user_id {
                Some(user_id) => envelope.with_user(user_id),
                None => envelope,
            }
        })
        .collect()
}

// ============================================================================
// Domain Event Trait
// ============================================================================

/// All domain events implement this trait to be stored and replayed.
pub trait DomainEvent: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync {
    /// Name of the concrete event variant, e.g. "OrderCreated"
    fn event_type(&self) -> &'static str;
    fn event_version() -> i32 where Self: Sized { 1 }
}

// ============================================================================
// Event Serialization Helpers
// ============================================================================

pub fn serialize_event<E: Serialize>(event: &E) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

pub fn deserialize_event<E: for<'de> Deserialize<'de>>(json: &str) -> Result<E> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Clone, Debug)]
    struct TestEvent {
        data: String,
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str { "TestEvent" }
    }

    #[test]
    fn test_event_envelope_creation() {
        let aggregate_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();

        let envelope = EventEnvelope::new(
            aggregate_id,
            1,
            TestEvent { data: "test".to_string() },
            correlation_id,
        )
        .with_user(7);

        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.sequence_number, 1);
        assert_eq!(envelope.event_type, "TestEvent");
        assert_eq!(envelope.event_version, 1);
        assert_eq!(envelope.correlation_id, correlation_id);
        assert_eq!(envelope.user_id, Some(7));
    }

    #[test]
    fn test_wrap_events_numbers_after_current_version() {
        let aggregate_id = Uuid::new_v4();
        let events = vec![
            TestEvent { data: "a".to_string() },
            TestEvent { data: "b".to_string() },
        ];

        let envelopes = wrap_events(aggregate_id, 4, events, Uuid::new_v4(), None);

        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].sequence_number, 5);
        assert_eq!(envelopes[1].sequence_number, 6);
        assert_eq!(envelopes[0].correlation_id, envelopes[1].correlation_id);
        assert!(envelopes.iter().all(|e| e.user_id.is_none()));
    }

    #[test]
    fn test_event_serialization() {
        let event = TestEvent {
            data: "test data".to_string(),
        };

        let json = serialize_event(&event).unwrap();
        let deserialized: TestEvent = deserialize_event(&json).unwrap();

        assert_eq!(event.data, deserialized.data);
    }
}
