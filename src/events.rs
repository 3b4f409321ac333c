//! Lineage events and notifiers
//!
//! The engine reports what it persisted to an injected [`LineageNotifier`].
//! Delivery is best effort: a failing notifier is logged and never rolls
//! back the write that triggered it.

use serde::Serialize;
use tracing::{info, warn};

use crate::graph::{ArtefactId, RelationshipId};
use crate::Result;

/// Something the engine persisted, or failed to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LineageEvent {
    /// A new artefact type was registered
    ArtefactClassCreated {
        /// Registered type name
        type_name: String,
    },
    /// An artefact was saved
    ArtefactCreated {
        /// Artefact type
        type_name: String,
        /// Store-assigned id
        artefact_id: ArtefactId,
    },
    /// Saving an artefact failed
    ArtefactCreationFailed {
        /// Artefact type
        type_name: String,
        /// Error message
        reason: String,
    },
    /// A lineage edge was saved
    RelationshipCreated {
        /// Store-assigned id
        relationship_id: RelationshipId,
        /// Edge type
        relationship_type: String,
        /// Input side
        parent: ArtefactId,
        /// Output side
        child: ArtefactId,
    },
}

impl LineageEvent {
    /// Stable event name, the serde tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ArtefactClassCreated { .. } => "artefact_class_created",
            Self::ArtefactCreated { .. } => "artefact_created",
            Self::ArtefactCreationFailed { .. } => "artefact_creation_failed",
            Self::RelationshipCreated { .. } => "relationship_created",
        }
    }
}

/// Sink for [`LineageEvent`]s (a pub/sub topic, a webhook, a test recorder).
pub trait LineageNotifier: Send + Sync {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Any error is logged by the caller and otherwise ignored.
    fn notify(&self, event: &LineageEvent) -> Result<()>;
}

/// Logs every event through `tracing`. The default notifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl LineageNotifier for TracingNotifier {
    fn notify(&self, event: &LineageEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        match event {
            LineageEvent::ArtefactCreationFailed { .. } => {
                warn!(event = event.name(), %payload, "lineage event");
            }
            _ => info!(event = event.name(), %payload, "lineage event"),
        }
        Ok(())
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl LineageNotifier for NoopNotifier {
    fn notify(&self, _event: &LineageEvent) -> Result<()> {
        Ok(())
    }
}

/// Deliver `event`, logging and swallowing notifier failures.
pub(crate) fn dispatch(notifier: &dyn LineageNotifier, event: &LineageEvent) {
    if let Err(err) = notifier.notify(event) {
        warn!(event = event.name(), error = %err, "lineage notifier failed, event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct Failing;

    impl LineageNotifier for Failing {
        fn notify(&self, _event: &LineageEvent) -> Result<()> {
            Err(Error::Store("broker unreachable".to_string()))
        }
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LineageEvent::ArtefactCreated {
            type_name: "ml_use_case".to_string(),
            artefact_id: ArtefactId(4),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "artefact_created");
        assert_eq!(json["artefact_id"], 4);
        assert_eq!(event.name(), "artefact_created");
    }

    #[test]
    fn test_dispatch_swallows_failures() {
        let event = LineageEvent::ArtefactClassCreated {
            type_name: "x".to_string(),
        };
        dispatch(&Failing, &event);
        dispatch(&NoopNotifier, &event);
        assert!(TracingNotifier.notify(&event).is_ok());
    }
}
