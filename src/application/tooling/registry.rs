use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::error::{RegistryError, ToolInvokeError};
use super::schema::{ToolArgs, ToolSchema};

/// What a tool implementation hands back to the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Text(String),
    /// Ends the whole session, not just the turn.
    Terminate(String),
}

/// Implementation behind a registered tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, args: ToolArgs) -> Result<ToolOutput, ToolInvokeError>;
}

#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    schema: ToolSchema,
    handler: Arc<dyn ToolHandler>,
    ends_session: bool,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ToolSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler,
            ends_session: false,
        }
    }

    /// Marks a tool whose successful run closes the session.
    pub fn ending_session(mut self) -> Self {
        self.ends_session = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    pub fn ends_session(&self) -> bool {
        self.ends_session
    }

    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.schema.to_json_schema(),
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .field("ends_session", &self.ends_session)
            .finish_non_exhaustive()
    }
}

/// Catalog entry presented to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every builtin git, file and session tool.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        super::builtin::register_all(&mut registry)?;
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, RegistryError> {
        self.index
            .get(name)
            .map(|&position| &self.tools[position])
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// Whether `name` is registered as a session-ending tool.
    pub fn ends_session(&self, name: &str) -> bool {
        self.resolve(name).is_ok_and(ToolDescriptor::ends_session)
    }

    /// Registered tools in registration order.
    pub fn catalog(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(ToolDescriptor::spec).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::tooling::schema::{ParamKind, ParamSpec};

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn invoke(&self, args: ToolArgs) -> Result<ToolOutput, ToolInvokeError> {
            Ok(ToolOutput::Text(args.string("text")?.to_string()))
        }
    }

    fn echo(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(
            name,
            "Echo the input.",
            ToolSchema::new().param(ParamSpec::required("text", ParamKind::String)),
            Arc::new(Echo),
        )
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("echo")).expect("first registration");

        let error = registry.register(echo("echo")).expect_err("duplicate");
        assert_eq!(error, RegistryError::DuplicateTool("echo".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn names_match_exactly() {
        let registry = ToolRegistry::builtin().expect("builtin tools register cleanly");
        assert!(registry.resolve("git_commit").is_ok());

        let error = registry.resolve("GIT_COMMIT").expect_err("case differs");
        assert_eq!(error, RegistryError::UnknownTool("GIT_COMMIT".into()));
    }

    #[test]
    fn resolve_reports_unknown_tool() {
        let registry = ToolRegistry::new();
        let error = registry.resolve("missing").expect_err("unknown");
        assert_eq!(error, RegistryError::UnknownTool("missing".into()));
    }

    #[test]
    fn catalog_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["b_tool", "a_tool", "c_tool"] {
            registry.register(echo(name)).expect("register");
        }

        let names: Vec<String> = registry.catalog().into_iter().map(|spec| spec.name).collect();
        assert_eq!(names, vec!["b_tool", "a_tool", "c_tool"]);
        assert_eq!(registry.catalog()[0].parameters["required"][0], "text");
    }

    #[test]
    fn builtin_registry_contains_full_tool_set() {
        let registry = ToolRegistry::builtin().expect("builtin tools register cleanly");
        let names: Vec<String> = registry.catalog().into_iter().map(|spec| spec.name).collect();

        assert_eq!(names.len(), 18);
        assert_eq!(names.first().map(String::as_str), Some("now_date_time"));
        assert!(names.iter().any(|name| name == "git_commit"));
        assert!(names.iter().any(|name| name == "file_read"));
        assert_eq!(names.last().map(String::as_str), Some("tree"));
    }
}
