//! `check_connectivity`: a lightweight read of the controller's ping endpoint.

use crate::controller::{ApiRequest, Transport};
use crate::tools::schema::Arguments;
use crate::tools::traits::{ToolDescriptor, ToolError, ToolHandler};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub struct CheckConnectivity {
    descriptor: ToolDescriptor,
    transport: Arc<dyn Transport>,
}

impl CheckConnectivity {
    pub const NAME: &'static str = "check_connectivity";

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                Self::NAME,
                "Check that the automation controller is reachable and report its version.",
                Vec::new(),
            ),
            transport,
        }
    }
}

#[async_trait]
impl ToolHandler for CheckConnectivity {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, _args: Arguments) -> Result<Value, ToolError> {
        let resp = self.transport.send(ApiRequest::get("ping/")).await?;
        let info: Value = resp.json()?;
        debug!("Controller ping: {}", info);

        Ok(json!({
            "reachable": true,
            "version": info.get("version").cloned().unwrap_or(Value::Null),
            "active_node": info.get("active_node").cloned().unwrap_or(Value::Null),
        }))
    }
}
