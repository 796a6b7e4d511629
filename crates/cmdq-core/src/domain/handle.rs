//! Command handles: the identity + metadata returned from `send`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::HandleId;

/// Priority used when the caller does not pick one. Lower values run first.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Caller-owned tags attached at submission.
///
/// The processor never looks inside; tags are handed back unchanged to
/// callbacks and copied onto chained follow-up submissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<serde_json::Value>);

impl Tags {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builder-style append.
    pub fn with(mut self, tag: impl Into<serde_json::Value>) -> Self {
        self.0.push(tag.into());
        self
    }

    pub fn push(&mut self, tag: impl Into<serde_json::Value>) {
        self.0.push(tag.into());
    }

    pub fn get(&self, index: usize) -> Option<&serde_json::Value> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[serde_json::Value] {
        &self.0
    }
}

impl From<Vec<serde_json::Value>> for Tags {
    fn from(tags: Vec<serde_json::Value>) -> Self {
        Self(tags)
    }
}

impl FromIterator<serde_json::Value> for Tags {
    fn from_iter<I: IntoIterator<Item = serde_json::Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Serializable snapshot of a handle (for logs, status pages, tests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleView {
    pub id: HandleId,
    pub processor: String,
    pub command: String,
    pub priority: i32,
    pub sequence: u64,
    pub tags: Tags,
    pub submitted_at: DateTime<Utc>,
}

/// Handle for one submitted command.
///
/// Created by the processor at submission time and immutable afterwards.
/// Clones share the same record, and equality is identity (`id`), so a handle
/// received in a callback compares equal to the one `send` returned.
#[derive(Clone)]
pub struct CommandHandle {
    inner: Arc<HandleView>,
}

impl CommandHandle {
    pub(crate) fn new(
        processor: &str,
        command: &str,
        priority: i32,
        sequence: u64,
        tags: Tags,
    ) -> Self {
        Self {
            inner: Arc::new(HandleView {
                id: HandleId::generate(),
                processor: processor.to_string(),
                command: command.to_string(),
                priority,
                sequence,
                tags,
                submitted_at: Utc::now(),
            }),
        }
    }

    pub fn id(&self) -> HandleId {
        self.inner.id
    }

    /// Name of the processor the command was submitted to.
    pub fn processor(&self) -> &str {
        &self.inner.processor
    }

    /// Name the command reported for itself.
    pub fn command(&self) -> &str {
        &self.inner.command
    }

    pub fn priority(&self) -> i32 {
        self.inner.priority
    }

    pub fn sequence(&self) -> u64 {
        self.inner.sequence
    }

    pub fn tags(&self) -> &Tags {
        &self.inner.tags
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.inner.submitted_at
    }

    pub fn view(&self) -> HandleView {
        (*self.inner).clone()
    }
}

impl PartialEq for CommandHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for CommandHandle {}

impl std::hash::Hash for CommandHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("id", &self.inner.id)
            .field("processor", &self.inner.processor)
            .field("command", &self.inner.command)
            .field("priority", &self.inner.priority)
            .field("sequence", &self.inner.sequence)
            .field("tags", &self.inner.tags.len())
            .finish()
    }
}

impl fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cmd={} pri={} seq={}",
            self.inner.id, self.inner.command, self.inner.priority, self.inner.sequence
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_compare_equal_and_fresh_handles_do_not() {
        let a = CommandHandle::new("screen", "init", 10, 1, Tags::new());
        let b = a.clone();
        let c = CommandHandle::new("screen", "init", 10, 1, Tags::new());

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn handle_exposes_submission_metadata() {
        let tags = Tags::new().with(json!(["frame", 3]));
        let h = CommandHandle::new("imager", "ensure_size", 45, 7, tags.clone());

        assert_eq!(h.processor(), "imager");
        assert_eq!(h.command(), "ensure_size");
        assert_eq!(h.priority(), 45);
        assert_eq!(h.sequence(), 7);
        assert_eq!(h.tags(), &tags);
        assert!(h.to_string().contains("pri=45"));
    }

    #[test]
    fn view_serializes_tags_as_plain_array() {
        let h = CommandHandle::new("p", "c", DEFAULT_PRIORITY, 1, Tags::new().with("a").with(2));
        let value = serde_json::to_value(h.view()).unwrap();
        assert_eq!(value["tags"], json!(["a", 2]));
        assert_eq!(value["priority"], json!(50));
    }
}
