//! Routes tool invocations to handlers and shapes the results.
//!
//! Every invocation produces exactly one [`ToolResult`]. Handler errors never
//! leave this module as errors; they become `Failure` results with a stable
//! kind. Nothing is retried here.

use crate::tools::registry::ToolRegistry;
use crate::types::{FailureKind, ToolInvocation, ToolResult};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Dispatches invocations against a fixed registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Look up, validate and run one invocation.
    pub async fn dispatch(&self, invocation: ToolInvocation) -> ToolResult {
        let ToolInvocation { name, arguments } = invocation;

        let Some(handler) = self.registry.get(&name) else {
            warn!("Unknown tool requested: {}", name);
            return ToolResult::failure(FailureKind::UnknownTool, format!("Unknown tool: {name}"));
        };

        let args = match handler.validate(&arguments) {
            Ok(args) => args,
            Err(e) => {
                debug!("Rejected arguments for '{}': {}", name, e);
                return ToolResult::failure(FailureKind::InvalidArguments, e.to_string());
            }
        };

        let started = Instant::now();
        let result = handler.execute(args).await;
        let elapsed = started.elapsed();

        match result {
            Ok(payload) => {
                info!("Tool '{}' succeeded in {:?}", name, elapsed);
                ToolResult::success(payload)
            }
            Err(e) => {
                let kind = e.kind();
                warn!("Tool '{}' failed after {:?} ({}): {}", name, elapsed, kind, e);
                ToolResult::failure(kind, e.to_string())
            }
        }
    }

    /// Like [`dispatch`](Self::dispatch), but abandons the call as soon as
    /// `cancel` fires. Dropping the handler future aborts any in-flight
    /// controller request.
    pub async fn dispatch_with_cancel(
        &self,
        invocation: ToolInvocation,
        cancel: CancellationToken,
    ) -> ToolResult {
        let name = invocation.name.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Tool '{}' cancelled by client", name);
                ToolResult::failure(FailureKind::Cancelled, format!("Tool call '{name}' was cancelled"))
            }
            result = self.dispatch(invocation) => result,
        }
    }
}
