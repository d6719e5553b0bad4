//! Tool descriptors and the name-indexed registry.
//!
//! A tool is a declarative descriptor (name, description, JSON Schema input
//! descriptor) plus an async handler. The schema is generated from the same
//! typed input struct the argument bag is deserialized into, so what is
//! advertised to callers is exactly what the dispatch boundary enforces.

use crate::db::ConnectionManager;
use crate::error::{CrmError, CrmResult};
use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A JSON argument bag, as delivered by either transport.
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Boxed tool handler: argument bag + database client -> structured payload.
pub type ToolHandler = Arc<
    dyn Fn(JsonObject, Arc<ConnectionManager>) -> BoxFuture<'static, CrmResult<JsonValue>>
        + Send
        + Sync,
>;

/// A named operation registered with the dispatcher.
#[derive(Clone)]
pub struct Tool {
    /// Unique registry key.
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema advertised to callers and enforced at dispatch.
    pub input_schema: Arc<JsonObject>,
    pub handler: ToolHandler,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Tool {
    /// Build a tool from a typed input struct and handler.
    ///
    /// The argument bag is validated once here, at the dispatch boundary: a
    /// mismatch against `I` yields a [`CrmError::Validation`] naming the
    /// tool, and the handler only ever sees a well-formed input value.
    pub fn typed<I, F, Fut>(name: &'static str, description: &'static str, handler: F) -> Self
    where
        I: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(I, Arc<ConnectionManager>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CrmResult<JsonValue>> + Send + 'static,
    {
        Self {
            name,
            description,
            input_schema: input_schema::<I>(),
            handler: Arc::new(
                move |args, db| -> BoxFuture<'static, CrmResult<JsonValue>> {
                    match serde_json::from_value::<I>(JsonValue::Object(args)) {
                        Ok(input) => Box::pin(handler(input, db)),
                        Err(e) => {
                            let err = CrmError::validation(format!(
                                "Invalid arguments for '{}': {}",
                                name, e
                            ));
                            Box::pin(std::future::ready(Err(err)))
                        }
                    }
                },
            ),
        }
    }

    /// The advertised descriptor (name, description, input schema).
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name,
            description: self.description,
            input_schema: JsonValue::Object((*self.input_schema).clone()),
        }
    }
}

/// Serializable tool advertisement for `list_tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: JsonValue,
}

/// Generate the JSON Schema object for a typed input struct.
fn input_schema<I: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(I)) {
        Ok(JsonValue::Object(map)) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

/// Name-indexed tool mapping, built once at startup from the per-domain
/// tool collections. Read-only afterwards.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// Concatenate domain collections into one registry.
    ///
    /// Duplicate names are rejected: a collision here is a programming
    /// error, and first-registered-wins or last-registered-wins would both
    /// hide it.
    pub fn from_collections(collections: impl IntoIterator<Item = Vec<Tool>>) -> CrmResult<Self> {
        let mut tools: Vec<Tool> = Vec::new();
        let mut index = HashMap::new();

        for collection in collections {
            for tool in collection {
                if index.contains_key(tool.name) {
                    return Err(CrmError::internal(format!(
                        "Duplicate tool name '{}' during registry construction",
                        tool.name
                    )));
                }
                index.insert(tool.name, tools.len());
                tools.push(tool);
            }
        }

        Ok(Self { tools, index })
    }

    /// Look a tool up by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools in registration order.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
