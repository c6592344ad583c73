//! Builtin tool set: session control, git and filesystem operations.
//!
//! Each tool is one [`Builtin`] variant, so the set the model can reach is
//! closed and enumerable. Variants are registered by name into a
//! [`ToolRegistry`] and dispatched back through [`ToolHandler`].

mod basic;
mod files;
mod git;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::error::{RegistryError, ToolInvokeError};
use super::registry::{ToolDescriptor, ToolHandler, ToolOutput, ToolRegistry};
use super::schema::{ParamKind, ParamSpec, ToolArgs, ToolSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    NowDateTime,
    QuitConversation,
    GitInit,
    GitStatus,
    GitAdd,
    GitCommit,
    GitLog,
    GitBranch,
    GitCheckout,
    GitMerge,
    GitPush,
    GitPull,
    GitClone,
    GitDiff,
    GitReset,
    FileRead,
    FileWrite,
    Tree,
}

impl Builtin {
    /// Registration order, which is also the catalog order shown to the model.
    pub const ALL: [Builtin; 18] = [
        Builtin::NowDateTime,
        Builtin::QuitConversation,
        Builtin::GitInit,
        Builtin::GitStatus,
        Builtin::GitAdd,
        Builtin::GitCommit,
        Builtin::GitLog,
        Builtin::GitBranch,
        Builtin::GitCheckout,
        Builtin::GitMerge,
        Builtin::GitPush,
        Builtin::GitPull,
        Builtin::GitClone,
        Builtin::GitDiff,
        Builtin::GitReset,
        Builtin::FileRead,
        Builtin::FileWrite,
        Builtin::Tree,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::NowDateTime => "now_date_time",
            Builtin::QuitConversation => "quit_conversation",
            Builtin::GitInit => "git_init",
            Builtin::GitStatus => "git_status",
            Builtin::GitAdd => "git_add",
            Builtin::GitCommit => "git_commit",
            Builtin::GitLog => "git_log",
            Builtin::GitBranch => "git_branch",
            Builtin::GitCheckout => "git_checkout",
            Builtin::GitMerge => "git_merge",
            Builtin::GitPush => "git_push",
            Builtin::GitPull => "git_pull",
            Builtin::GitClone => "git_clone",
            Builtin::GitDiff => "git_diff",
            Builtin::GitReset => "git_reset",
            Builtin::FileRead => "file_read",
            Builtin::FileWrite => "file_write",
            Builtin::Tree => "tree",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Builtin::NowDateTime => "Get the current date and time.",
            Builtin::QuitConversation => "Quit the conversation.",
            Builtin::GitInit => "Initialize a new Git repository.",
            Builtin::GitStatus => "Get the status of the Git repository.",
            Builtin::GitAdd => "Add a file to the staging area.",
            Builtin::GitCommit => "Commit changes to the repository.",
            Builtin::GitLog => "Get the commit log of the repository.",
            Builtin::GitBranch => "Create a new branch.",
            Builtin::GitCheckout => "Checkout a branch.",
            Builtin::GitMerge => "Merge a branch into the current branch.",
            Builtin::GitPush => "Push changes to a remote repository.",
            Builtin::GitPull => "Pull changes from a remote repository.",
            Builtin::GitClone => "Clone a remote repository.",
            Builtin::GitDiff => "Get the diff of the repository.",
            Builtin::GitReset => "Reset a file in the working directory.",
            Builtin::FileRead => "Read the contents of a file.",
            Builtin::FileWrite => "Write content to a file.",
            Builtin::Tree => "List the directory structure.",
        }
    }

    pub fn schema(self) -> ToolSchema {
        let dir = || ParamSpec::required("dir", ParamKind::String).describe("Repository directory");
        let branch_name = || ParamSpec::required("branch_name", ParamKind::String);

        match self {
            Builtin::NowDateTime | Builtin::QuitConversation => ToolSchema::new(),
            Builtin::GitInit
            | Builtin::GitStatus
            | Builtin::GitLog
            | Builtin::GitDiff => ToolSchema::new().param(dir()),
            Builtin::GitAdd | Builtin::GitReset => ToolSchema::new()
                .param(dir())
                .param(ParamSpec::required("file", ParamKind::String)),
            Builtin::GitCommit => ToolSchema::new()
                .param(dir())
                .param(ParamSpec::required("message", ParamKind::String)),
            Builtin::GitBranch | Builtin::GitCheckout | Builtin::GitMerge => {
                ToolSchema::new().param(dir()).param(branch_name())
            }
            Builtin::GitPush | Builtin::GitPull => ToolSchema::new()
                .param(dir())
                .param(ParamSpec::optional(
                    "remote",
                    ParamKind::String,
                    Some(json!("origin")),
                ))
                .param(ParamSpec::optional(
                    "branch",
                    ParamKind::String,
                    Some(json!("main")),
                )),
            Builtin::GitClone => ToolSchema::new()
                .param(ParamSpec::required("repo_url", ParamKind::String))
                .param(dir()),
            Builtin::FileRead => {
                ToolSchema::new().param(ParamSpec::required("file_path", ParamKind::String))
            }
            Builtin::FileWrite => ToolSchema::new()
                .param(ParamSpec::required("file_path", ParamKind::String))
                .param(ParamSpec::required("content", ParamKind::String)),
            Builtin::Tree => {
                ToolSchema::new().param(ParamSpec::required("dir_path", ParamKind::String))
            }
        }
    }

    pub fn descriptor(self) -> ToolDescriptor {
        let descriptor =
            ToolDescriptor::new(self.name(), self.description(), self.schema(), Arc::new(self));
        match self {
            Builtin::QuitConversation => descriptor.ending_session(),
            _ => descriptor,
        }
    }
}

#[async_trait]
impl ToolHandler for Builtin {
    async fn invoke(&self, args: ToolArgs) -> Result<ToolOutput, ToolInvokeError> {
        let text = match self {
            Builtin::NowDateTime => basic::now_date_time(),
            Builtin::QuitConversation => return Ok(basic::quit_conversation()),
            Builtin::GitInit => git::init(&args).await?,
            Builtin::GitStatus => git::status(&args).await?,
            Builtin::GitAdd => git::add(&args).await?,
            Builtin::GitCommit => git::commit(&args).await?,
            Builtin::GitLog => git::log(&args).await?,
            Builtin::GitBranch => git::branch(&args).await?,
            Builtin::GitCheckout => git::checkout(&args).await?,
            Builtin::GitMerge => git::merge(&args).await?,
            Builtin::GitPush => git::push(&args).await?,
            Builtin::GitPull => git::pull(&args).await?,
            Builtin::GitClone => git::clone(&args).await?,
            Builtin::GitDiff => git::diff(&args).await?,
            Builtin::GitReset => git::reset(&args).await?,
            Builtin::FileRead => files::read(&args).await?,
            Builtin::FileWrite => files::write(&args).await?,
            Builtin::Tree => files::tree(&args).await?,
        };
        Ok(ToolOutput::Text(text))
    }
}

pub(super) fn register_all(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    for tool in Builtin::ALL {
        registry.register(tool.descriptor())?;
    }
    Ok(())
}
