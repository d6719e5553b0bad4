//! Tool dispatch and response normalization.
//!
//! The dispatcher is the single place where a tool invocation outcome is
//! turned into the uniform response envelope, and the single place where
//! handler failures are logged. Both transports call through here, so the
//! error contract is identical on each surface: an unknown name or a failed
//! handler is always a structured error, never a normal-shaped response
//! with an error message inside.

use crate::db::ConnectionManager;
use crate::error::{CrmError, CrmResult};
use crate::tools::registry::{JsonObject, ToolDescriptor, ToolRegistry};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, error};

/// One block of tool output. Currently always text.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Uniform response envelope returned by every successful invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    /// Ordered content blocks; one text block carrying the serialized
    /// payload with stable 2-space indentation.
    pub content: Vec<ContentBlock>,
    /// The structured payload, for transports that re-serialize it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<JsonValue>,
}

impl ToolResponse {
    /// Wrap a structured payload.
    pub fn structured(payload: JsonValue) -> Self {
        let text =
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
        Self {
            content: vec![ContentBlock::Text { text }],
            structured: Some(payload),
        }
    }

    /// Wrap a plain message.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            structured: None,
        }
    }
}

/// Resolves tool invocations by name and normalizes their outcome.
pub struct Dispatcher {
    registry: ToolRegistry,
    connection_manager: Arc<ConnectionManager>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            registry,
            connection_manager,
        }
    }

    /// Advertised descriptors for every registered tool.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.tools().iter().map(|t| t.descriptor()).collect()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Resolve `name`, run its handler with the argument bag, and wrap the
    /// outcome. An unknown name fails with the known-names list before any
    /// database work happens.
    pub async fn invoke(&self, name: &str, args: JsonObject) -> CrmResult<ToolResponse> {
        let Some(tool) = self.registry.get(name) else {
            return Err(CrmError::unknown_tool(name, self.registry.names()));
        };

        debug!(tool = name, "Dispatching tool invocation");
        match (tool.handler)(args, self.connection_manager.clone()).await {
            Ok(payload) => Ok(ToolResponse::structured(payload)),
            Err(err) => {
                error!(tool = name, error = %err, "Tool invocation failed");
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::Tool;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct PingInput {
        #[serde(default)]
        label: Option<String>,
    }

    fn dispatcher() -> Dispatcher {
        let ping = Tool::typed::<PingInput, _, _>("ping", "Reply with pong", |input, _db| {
            async move { Ok(json!({ "pong": input.label.unwrap_or_else(|| "default".into()) })) }
        });
        let registry = ToolRegistry::from_collections([vec![ping]]).unwrap();
        let manager =
            Arc::new(ConnectionManager::from_url("mysql://crm@127.0.0.1:1/crm", 1).unwrap());
        Dispatcher::new(registry, manager)
    }

    #[tokio::test]
    async fn test_invoke_wraps_payload_in_envelope() {
        let d = dispatcher();
        let response = d.invoke("ping", JsonObject::new()).await.unwrap();
        assert_eq!(response.content.len(), 1);
        let ContentBlock::Text { text } = &response.content[0];
        // Stable 2-space indentation
        assert!(text.contains("{\n  \"pong\": \"default\"\n}"));
        assert_eq!(response.structured.as_ref().unwrap()["pong"], "default");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_structured_not_found() {
        let d = dispatcher();
        let err = d.invoke("nope", JsonObject::new()).await.unwrap_err();
        match err {
            CrmError::UnknownTool { name, known } => {
                assert_eq!(name, "nope");
                assert_eq!(known, vec!["ping".to_string()]);
            }
            other => panic!("expected UnknownTool, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_arguments_surface_as_validation() {
        let d = dispatcher();
        let mut args = JsonObject::new();
        args.insert("label".to_string(), json!([1, 2, 3]));
        let err = d.invoke("ping", args).await.unwrap_err();
        assert!(matches!(err, CrmError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_list_tools_advertises_descriptors() {
        let d = dispatcher();
        let tools = d.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "ping");
        assert!(tools[0].input_schema.is_object());
    }

    #[test]
    fn test_message_response_has_no_structured_payload() {
        let response = ToolResponse::message("ok");
        assert!(response.structured.is_none());
        let ContentBlock::Text { text } = &response.content[0];
        assert_eq!(text, "ok");
    }
}
