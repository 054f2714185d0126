//! Core aggregate and domain event traits.

use doc_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + Send + Sync + Clone + std::fmt::Debug {
    /// Returns the event type name, used for logging and metrics labels.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates persisted as versioned documents.
///
/// Command methods never mutate state. They validate against the current
/// state and return the events that would result; [`Aggregate::apply`]
/// then folds those events into the state before it is written back.
/// The stored document always holds the state after the latest event.
pub trait Aggregate: Serialize + DeserializeOwned + Clone + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Name of the document collection holding this aggregate.
    fn collection() -> &'static str;

    /// Key of this instance within its collection.
    fn key(&self) -> String;

    /// Returns the version this instance was loaded at.
    ///
    /// `Version::initial()` for an instance that has never been stored.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the repository after loading or storing.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic:
    /// - Given the same state and event, it must always produce the same new state
    /// - It must not have side effects
    /// - It must not fail (events represent facts that have happened)
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Renamed { name: String },
        Counted { value: i32 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Renamed { .. } => "TestRenamed",
                TestEvent::Counted { .. } => "TestCounted",
            }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct TestAggregate {
        key: String,
        name: String,
        value: i32,
        #[serde(skip)]
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    impl Aggregate for TestAggregate {
        type Event = TestEvent;
        type Error = TestError;

        fn collection() -> &'static str {
            "tests"
        }

        fn key(&self) -> String {
            self.key.clone()
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TestEvent::Renamed { name } => self.name = name,
                TestEvent::Counted { value } => self.value += value,
            }
        }
    }

    #[test]
    fn test_aggregate_apply_events() {
        let mut aggregate = TestAggregate::default();
        aggregate.apply_events(vec![
            TestEvent::Renamed {
                name: "basket".to_string(),
            },
            TestEvent::Counted { value: 40 },
            TestEvent::Counted { value: 2 },
        ]);

        assert_eq!(aggregate.name, "basket");
        assert_eq!(aggregate.value, 42);
    }

    #[test]
    fn test_domain_event_type() {
        assert_eq!(TestEvent::Counted { value: 1 }.event_type(), "TestCounted");
    }

    #[test]
    fn test_version_is_not_serialized() {
        let mut aggregate = TestAggregate::default();
        aggregate.set_version(Version::new(7));
        let json = serde_json::to_value(&aggregate).unwrap();
        assert!(json.get("version").is_none());
    }
}
