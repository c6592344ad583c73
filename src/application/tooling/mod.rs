pub mod builtin;
pub mod error;
pub mod guard;
pub mod registry;
pub mod schema;

pub use builtin::Builtin;
pub use error::{RegistryError, ToolInvokeError};
pub use guard::{Dispatch, ToolGuard, format_tool_error};
pub use registry::{ToolDescriptor, ToolHandler, ToolOutput, ToolRegistry, ToolSpec};
pub use schema::{ParamKind, ParamSpec, ToolArgs, ToolSchema};
