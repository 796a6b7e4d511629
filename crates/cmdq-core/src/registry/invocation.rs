use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::HandlerRegistry;
use crate::command::Command;
use crate::domain::CommandHandle;
use crate::error::CommandError;

/// A command addressed by name, resolved against a registry at execution time.
///
/// Nothing is checked at submission; an unregistered name surfaces as
/// `CommandError::UnknownCommand` when the worker gets to it.
pub struct Invocation<C> {
    name: String,
    payload: serde_json::Value,
    registry: Arc<HandlerRegistry<C>>,
}

impl<C> Invocation<C> {
    pub fn new(
        registry: &Arc<HandlerRegistry<C>>,
        name: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            payload,
            registry: Arc::clone(registry),
        }
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}

impl<C> fmt::Debug for Invocation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("name", &self.name)
            .field("payload", &self.payload)
            .finish()
    }
}

#[async_trait]
impl<C: Send + 'static> Command for Invocation<C> {
    type Context = C;
    type Output = serde_json::Value;

    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        self,
        _handle: &CommandHandle,
        cx: &mut C,
    ) -> Result<serde_json::Value, CommandError> {
        let handler = self
            .registry
            .get(&self.name)
            .ok_or_else(|| CommandError::UnknownCommand(self.name.clone()))?;

        handler.handle_dyn(self.payload, cx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tags;
    use crate::registry::{Handler, Payload};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Push {
        value: i64,
    }

    impl Payload for Push {
        const NAME: &'static str = "stack.push";
    }

    struct PushHandler;

    #[async_trait]
    impl Handler<Push, Vec<i64>> for PushHandler {
        type Output = usize;

        async fn handle(&self, payload: Push, cx: &mut Vec<i64>) -> Result<usize, CommandError> {
            cx.push(payload.value);
            Ok(cx.len())
        }
    }

    fn registry() -> Arc<HandlerRegistry<Vec<i64>>> {
        let mut registry = HandlerRegistry::new();
        registry.register::<Push, _>(PushHandler).unwrap();
        Arc::new(registry)
    }

    fn handle(name: &str) -> CommandHandle {
        CommandHandle::new("stack", name, 50, 1, Tags::new())
    }

    #[tokio::test]
    async fn invocation_runs_the_registered_handler() {
        let registry = registry();
        let mut stack = Vec::new();

        let cmd = Invocation::new(&registry, "stack.push", json!({ "value": 7 }));
        assert_eq!(cmd.name(), "stack.push");

        let out = cmd.execute(&handle("stack.push"), &mut stack).await.unwrap();
        assert_eq!(out, json!(1));
        assert_eq!(stack, vec![7]);
    }

    #[tokio::test]
    async fn unregistered_name_is_an_unknown_command() {
        let registry = registry();
        let mut stack = Vec::new();

        let cmd = Invocation::new(&registry, "stack.pop", json!(null));
        let err = cmd.execute(&handle("stack.pop"), &mut stack).await.unwrap_err();
        assert!(matches!(err, CommandError::UnknownCommand(name) if name == "stack.pop"));
    }
}
