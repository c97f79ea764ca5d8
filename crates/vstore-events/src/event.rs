use serde::{Deserialize, Serialize};
use vstore_types::{ObjectId, VersionId};

use crate::error::EventResult;

/// Announces that a new version of an object is about to be committed.
///
/// `current_version_id` is the version being superseded, `None` for a newly
/// created object. A consumer may receive this event for a version that never
/// committed and must check the store before acting on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectVersionCreatingEvent {
    pub object_id: ObjectId,
    pub current_version_id: Option<VersionId>,
}

impl ObjectVersionCreatingEvent {
    pub fn new(object_id: ObjectId, current_version_id: Option<VersionId>) -> Self {
        Self {
            object_id,
            current_version_id,
        }
    }

    /// Partition key: events of one object stay ordered.
    pub fn key(&self) -> String {
        self.object_id.to_string()
    }

    pub fn to_envelope(&self, topic: &str) -> EventResult<EventEnvelope> {
        Ok(EventEnvelope {
            topic: topic.to_string(),
            key: self.key(),
            payload: serde_json::to_string(self)?,
        })
    }
}

/// An event as handed to the broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub topic: String,
    pub key: String,
    pub payload: String,
}

impl EventEnvelope {
    pub fn decode_object_event(&self) -> EventResult<ObjectVersionCreatingEvent> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}
