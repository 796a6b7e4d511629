//! Named-command registry.
//!
//! For command sets that are only known at runtime (names coming off the
//! wire, plugin-style handlers). Enum commands do not need this.
//!
//! Design:
//! - built during initialization (mutable)
//! - shared with `Arc` afterwards (immutable, no locks)
//!
//! # 使用例
//! ```ignore
//! let mut registry = HandlerRegistry::new();
//! registry.register::<RenderText, _>(RenderTextHandler)?;
//! let registry = Arc::new(registry);
//!
//! // 名前で解決、未登録なら on_error に UnknownCommand
//! render.send(Invocation::new(&registry, "render.text", json!({ "text": "hi" })))?;
//! ```

mod handler;
mod invocation;

pub use handler::{DynHandler, Handler, Payload, TypedHandler};
pub use invocation::Invocation;

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handler for command '{0}' is already registered")]
    DuplicateHandler(String),
}

/// Command name -> handler.
pub struct HandlerRegistry<C> {
    handlers: HashMap<String, Arc<dyn DynHandler<C>>>,
}

impl<C: Send + 'static> HandlerRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a typed handler under `T::NAME`.
    pub fn register<T, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        T: Payload,
        H: Handler<T, C> + 'static,
    {
        self.register_dyn(T::NAME, Arc::new(TypedHandler::<T, H>::new(handler)))
    }

    /// Register an already-erased handler under an explicit name.
    pub fn register_dyn(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn DynHandler<C>>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::DuplicateHandler(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DynHandler<C>>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<C: Send + 'static> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Ping;

    impl Payload for Ping {
        const NAME: &'static str = "test.ping";
    }

    #[derive(Deserialize)]
    struct Echo {
        #[allow(dead_code)]
        text: String,
    }

    impl Payload for Echo {
        const NAME: &'static str = "test.echo";
    }

    struct PingHandler;

    #[async_trait]
    impl Handler<Ping, ()> for PingHandler {
        type Output = &'static str;

        async fn handle(&self, _payload: Ping, _cx: &mut ()) -> Result<&'static str, CommandError> {
            Ok("pong")
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl Handler<Echo, ()> for EchoHandler {
        type Output = String;

        async fn handle(&self, payload: Echo, _cx: &mut ()) -> Result<String, CommandError> {
            Ok(payload.text)
        }
    }

    #[test]
    fn register_and_get() {
        let mut registry = HandlerRegistry::<()>::new();
        registry.register::<Ping, _>(PingHandler).unwrap();

        assert!(registry.get(Ping::NAME).is_some());
        assert!(registry.get(Echo::NAME).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = HandlerRegistry::<()>::new();
        registry.register::<Ping, _>(PingHandler).unwrap();

        let result = registry.register::<Ping, _>(PingHandler);
        assert_eq!(result, Err(RegistryError::DuplicateHandler(Ping::NAME.to_string())));
    }

    #[test]
    fn registered_names_are_sorted() {
        let mut registry = HandlerRegistry::<()>::new();
        registry.register::<Ping, _>(PingHandler).unwrap();
        registry.register::<Echo, _>(EchoHandler).unwrap();

        assert_eq!(registry.registered_names(), vec!["test.echo", "test.ping"]);
    }
}
