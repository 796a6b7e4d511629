use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cmdq_core::registry::{Handler, HandlerRegistry, Invocation, Payload};
use cmdq_core::{
    Command, CommandError, CommandHandle, Processor, SendOptions, Tags, WorkerPool,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Stand-in for a slow, blocking e-paper panel.
#[derive(Debug, Default)]
struct Panel {
    powered: bool,
    shown: Vec<String>,
}

enum PanelCmd {
    Init,
    Clear,
    Display(String),
    Sleep,
    Uninit,
}

#[async_trait]
impl Command for PanelCmd {
    type Context = Panel;
    type Output = usize;

    fn name(&self) -> &str {
        match self {
            PanelCmd::Init => "init",
            PanelCmd::Clear => "clear",
            PanelCmd::Display(_) => "display",
            PanelCmd::Sleep => "sleep",
            PanelCmd::Uninit => "uninit",
        }
    }

    async fn execute(self, handle: &CommandHandle, panel: &mut Panel) -> Result<usize, CommandError> {
        match self {
            PanelCmd::Init => panel.powered = true,
            PanelCmd::Uninit => panel.powered = false,
            _ if !panel.powered => {
                return Err(CommandError::execution(format!("panel is off ({})", handle.command())));
            }
            PanelCmd::Clear => panel.shown.clear(),
            PanelCmd::Display(frame) => {
                // the real device blocks for the whole refresh
                std::thread::sleep(Duration::from_millis(50));
                panel.shown.push(frame);
            }
            PanelCmd::Sleep => std::thread::sleep(Duration::from_millis(20)),
        }
        Ok(panel.shown.len())
    }
}

#[derive(Debug, Deserialize)]
struct RenderText {
    text: String,
}

impl Payload for RenderText {
    const NAME: &'static str = "render.text";
}

/// Renders into a shared frame counter.
struct RenderTextHandler;

#[async_trait]
impl Handler<RenderText, u32> for RenderTextHandler {
    type Output = String;

    async fn handle(&self, payload: RenderText, frames: &mut u32) -> Result<String, CommandError> {
        *frames += 1;
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(format!("[{frames}] {}", payload.text))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,cmdq_core=debug")),
        )
        .init();

    // (A) panel: blocking device, its own thread out of a small pool
    let devices = WorkerPool::new("devices", 2);
    let panel = Processor::<PanelCmd>::builder("panel")
        .pool(&devices)
        .on_result(|handle, shown| {
            info!(handle = %handle, tags = ?handle.tags(), shown, "panel updated");
            Ok(())
        })
        .on_error(|handle, err| warn!(handle = %handle, kind = err.kind(), error = %err, "panel command failed"))
        .build(Panel::default())?;

    // (B) render: commands addressed by name through a registry
    let mut registry = HandlerRegistry::new();
    registry.register::<RenderText, _>(RenderTextHandler)?;
    let registry = Arc::new(registry);

    let render = Processor::<Invocation<u32>>::builder("render")
        .on_error(|handle, err| warn!(handle = %handle, kind = err.kind(), error = %err, "render failed"))
        .build(0)?;

    // (C) queue before starting; the urgent init still goes first
    panel.send(PanelCmd::Display("too early".into()))?;
    panel.send_with(PanelCmd::Init, SendOptions::new().priority(10))?;
    panel.send_with(PanelCmd::Clear, SendOptions::new().priority(11))?;
    panel.start()?;
    render.start()?;

    // (D) render -> panel chains, tagged with the frame number
    let mut shown = Vec::new();
    for (n, text) in ["hello", "from", "cmdq"].into_iter().enumerate() {
        let tags = Tags::new().with("frame").with(n);
        let options = SendOptions::new().priority(100 + n as i32).tags(tags);
        let pending = render.request_with(Invocation::new(&registry, "render.text", json!({ "text": text })), options)?;
        let display = |frame: serde_json::Value| PanelCmd::Display(frame.as_str().unwrap_or_default().to_owned());
        shown.push(pending.and_then(&panel.sender(), display).await?);
    }
    for pending in shown {
        let handle = pending.handle().clone();
        match pending.await {
            Ok(count) => info!(handle = %handle, count, "frame shown"),
            Err(e) => warn!(handle = %handle, error = %e, "frame lost"),
        }
    }

    // (E) unknown name -> on_error
    render.send(Invocation::new(&registry, "render.image", json!({ "path": "cat.png" })))?;
    render.join().await;

    panel.send(PanelCmd::Sleep)?;
    panel.send(PanelCmd::Uninit)?;
    panel.join().await;

    info!(render = ?render.stats(), panel = ?panel.stats(), "done");
    render.halt().await?;
    panel.halt().await?;
    info!(free_slots = devices.available(), "pool released");
    Ok(())
}
