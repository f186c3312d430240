pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod schema;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use registry::{RegistryError, ToolRegistry};
pub use schema::{Arguments, ParamKind, ParamSpec, ValidationError};
pub use traits::{ToolDefinition, ToolDescriptor, ToolError, ToolHandler};

use crate::controller::Transport;
use crate::jobs::JobTracker;
use handlers::*;
use std::sync::Arc;

/// Build the registry of every built-in controller tool.
///
/// All handlers share one transport and one job tracker.
pub fn builtin_registry(
    transport: Arc<dyn Transport>,
    tracker: JobTracker,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(CheckConnectivity::new(transport.clone())))?;
    registry.register(Arc::new(ListJobTemplates::new(transport.clone())))?;
    registry.register(Arc::new(CreateJobTemplate::new(transport.clone())))?;
    registry.register(Arc::new(LaunchJobTemplate::new(
        transport.clone(),
        tracker.clone(),
    )))?;
    registry.register(Arc::new(ListJobs::new(transport.clone())))?;
    registry.register(Arc::new(GetJobStatus::new(transport.clone(), tracker.clone())))?;
    registry.register(Arc::new(GetJobStdout::new(transport)))?;
    registry.register(Arc::new(ListTrackedJobs::new(tracker)))?;

    Ok(registry)
}
