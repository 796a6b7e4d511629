use serde::{Deserialize, Serialize};

use crate::domain::DEFAULT_PRIORITY;

/// Where a processor's worker runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// A task on the ambient tokio runtime.
    #[default]
    Task,
    /// A dedicated OS thread driving its own current-thread runtime.
    /// For contexts that block (device I/O, sleeps).
    Thread,
}

/// Static processor settings.
///
/// Missing fields fall back to [`ProcessorConfig::default`] when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub name: String,
    pub worker: WorkerKind,
    pub default_priority: i32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            name: "processor".to_string(),
            worker: WorkerKind::Task,
            default_priority: DEFAULT_PRIORITY,
        }
    }
}

impl ProcessorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_worker(mut self, worker: WorkerKind) -> Self {
        self.worker = worker;
        self
    }

    pub fn with_default_priority(mut self, priority: i32) -> Self {
        self.default_priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ProcessorConfig = serde_json::from_str(r#"{ "name": "panel", "worker": "thread" }"#).unwrap();

        assert_eq!(config.name, "panel");
        assert_eq!(config.worker, WorkerKind::Thread);
        assert_eq!(config.default_priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = ProcessorConfig::new("render")
            .with_worker(WorkerKind::Thread)
            .with_default_priority(10);

        assert_eq!(
            config,
            ProcessorConfig {
                name: "render".into(),
                worker: WorkerKind::Thread,
                default_priority: 10,
            }
        );
    }
}
