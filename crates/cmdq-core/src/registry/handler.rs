//! Typed handlers and their object-safe erasure.
//!
//! - surface: `Payload` + `Handler<T, C>` (typed, checked at compile time)
//! - inside the registry: `DynHandler<C>` (JSON in, JSON out)
//!
//! # 学習ポイント
//! - `TypedHandler` が型付き Handler を `DynHandler` に包む（型消去）
//! - payload の decode 失敗は `InvalidData` として呼び出し側に返す

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CommandError;

/// Binds a payload type to the command name it is registered under.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct LoadFile { path: String }
///
/// impl Payload for LoadFile {
///     const NAME: &'static str = "imager.load_file";
/// }
/// ```
pub trait Payload: DeserializeOwned + Send + 'static {
    const NAME: &'static str;
}

/// Runs one payload type against the processor's context.
#[async_trait]
pub trait Handler<T: Payload, C: Send + 'static>: Send + Sync {
    type Output: Serialize + Send;

    async fn handle(&self, payload: T, cx: &mut C) -> Result<Self::Output, CommandError>;
}

/// Object-safe handler stored in the registry.
#[async_trait]
pub trait DynHandler<C: Send + 'static>: Send + Sync {
    async fn handle_dyn(
        &self,
        payload: serde_json::Value,
        cx: &mut C,
    ) -> Result<serde_json::Value, CommandError>;
}

/// Erases `Handler<T, C>` into `DynHandler<C>`.
pub struct TypedHandler<T, H> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T, H> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T, C, H> DynHandler<C> for TypedHandler<T, H>
where
    T: Payload,
    C: Send + 'static,
    H: Handler<T, C>,
{
    async fn handle_dyn(
        &self,
        payload: serde_json::Value,
        cx: &mut C,
    ) -> Result<serde_json::Value, CommandError> {
        let payload: T = serde_json::from_value(payload)
            .map_err(|e| CommandError::invalid_data(format!("{}: {e}", T::NAME)))?;
        let output = self.handler.handle(payload, cx).await?;
        serde_json::to_value(output).map_err(CommandError::execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Scale {
        factor: u32,
    }

    impl Payload for Scale {
        const NAME: &'static str = "test.scale";
    }

    struct ScaleHandler;

    #[async_trait]
    impl Handler<Scale, u32> for ScaleHandler {
        type Output = u32;

        async fn handle(&self, payload: Scale, cx: &mut u32) -> Result<u32, CommandError> {
            *cx *= payload.factor;
            Ok(*cx)
        }
    }

    #[tokio::test]
    async fn typed_handler_decodes_and_encodes_json() {
        let handler = TypedHandler::<Scale, _>::new(ScaleHandler);
        let mut cx = 3;

        let out = handler.handle_dyn(json!({ "factor": 5 }), &mut cx).await.unwrap();
        assert_eq!(out, json!(15));
        assert_eq!(cx, 15);
    }

    #[tokio::test]
    async fn payload_of_the_wrong_shape_is_invalid_data() {
        let handler = TypedHandler::<Scale, _>::new(ScaleHandler);
        let mut cx = 3;

        let err = handler.handle_dyn(json!("five"), &mut cx).await.unwrap_err();
        assert!(matches!(&err, CommandError::InvalidData(msg) if msg.starts_with("test.scale")));
        assert_eq!(cx, 3);
    }
}
