//! Git tools, run as `git` subprocesses against a target directory.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::application::tooling::error::ToolInvokeError;
use crate::application::tooling::schema::ToolArgs;

const GIT_PROGRAM: &str = "git";

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
struct Git {
    program: &'static str,
    tool: String,
    workdir: PathBuf,
}

impl Git {
    /// Opens an existing repository, failing unless `dir` is inside a work tree.
    async fn open(args: &ToolArgs) -> Result<Self, ToolInvokeError> {
        Self::open_with(GIT_PROGRAM, args).await
    }

    async fn open_with(program: &'static str, args: &ToolArgs) -> Result<Self, ToolInvokeError> {
        let git = Self {
            program,
            tool: args.tool().to_string(),
            workdir: args.path("dir")?,
        };
        let inside = git.run(&["rev-parse", "--is-inside-work-tree"]).await?;
        if inside.trim() != "true" {
            return Err(ToolInvokeError::execution(
                &git.tool,
                format!("not a git repository: {}", git.workdir.display()),
            ));
        }
        Ok(git)
    }

    #[instrument(skip(self), fields(tool = %self.tool, dir = %self.workdir.display()))]
    async fn run(&self, args: &[&str]) -> Result<String, ToolInvokeError> {
        let output = spawn(self.program, &self.tool, Some(&self.workdir), args).await?;
        checked(&self.tool, args, output)
    }
}

async fn spawn(
    program: &str,
    tool: &str,
    workdir: Option<&Path>,
    args: &[&str],
) -> Result<Output, ToolInvokeError> {
    let mut command = Command::new(program);
    if let Some(dir) = workdir {
        command.arg("-C").arg(dir);
    }
    debug!(tool, args = %args.join(" "), "Running git");
    command
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|error| ToolInvokeError::execution(tool, format!("failed to run git: {error}")))
}

fn checked(tool: &str, args: &[&str], output: Output) -> Result<String, ToolInvokeError> {
    let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    if output.status.success() {
        return Ok(stdout);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = if stderr.trim().is_empty() {
        stdout
    } else {
        stderr.trim().to_string()
    };
    Err(ToolInvokeError::execution(
        tool,
        format!("git {} failed: {detail}", args.first().copied().unwrap_or_default()),
    ))
}

pub(super) async fn init(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let dir = args.path("dir")?;
    tokio::fs::create_dir_all(&dir).await.map_err(|error| {
        ToolInvokeError::execution(
            args.tool(),
            format!("cannot create directory '{}': {error}", dir.display()),
        )
    })?;
    let output = spawn(GIT_PROGRAM, args.tool(), Some(&dir), &["init"]).await?;
    checked(args.tool(), &["init"], output)?;

    let canonical = tokio::fs::canonicalize(&dir).await;
    let root = canonical.unwrap_or(dir);
    Ok(format!(
        "Initialized empty Git repository in {}",
        root.join(".git").display()
    ))
}

pub(super) async fn status(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    Git::open(args).await?.run(&["status"]).await
}

pub(super) async fn add(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let file = args.string("file")?;
    Git::open(args).await?.run(&["add", "--", file]).await?;
    Ok(format!("Added {file} to staging area."))
}

pub(super) async fn commit(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let message = args.string("message")?;
    Git::open(args)
        .await?
        .run(&["commit", "--allow-empty", "-m", message])
        .await?;
    Ok(format!("Committed changes with message: {message}"))
}

pub(super) async fn log(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    Git::open(args).await?.run(&["log"]).await
}

pub(super) async fn branch(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let name = args.string("branch_name")?;
    Git::open(args).await?.run(&["branch", name]).await?;
    Ok(format!("Created new branch: {name}"))
}

pub(super) async fn checkout(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let name = args.string("branch_name")?;
    Git::open(args).await?.run(&["checkout", name]).await?;
    Ok(format!("Checked out branch: {name}"))
}

pub(super) async fn merge(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let name = args.string("branch_name")?;
    Git::open(args).await?.run(&["merge", name]).await?;
    Ok(format!("Merged branch {name} into current branch."))
}

pub(super) async fn push(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let remote = args.string("remote")?;
    let branch = args.string("branch")?;
    Git::open(args).await?.run(&["push", remote, branch]).await?;
    Ok(format!("Pushed changes to {remote}/{branch}."))
}

pub(super) async fn pull(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let remote = args.string("remote")?;
    let branch = args.string("branch")?;
    Git::open(args).await?.run(&["pull", remote, branch]).await?;
    Ok(format!("Pulled changes from {remote}/{branch}."))
}

pub(super) async fn clone(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let url = args.string("repo_url")?;
    let dir = args.path("dir")?;
    let target = dir.to_string_lossy();
    let command = ["clone", url, target.as_ref()];
    let output = spawn(GIT_PROGRAM, args.tool(), None, &command).await?;
    checked(args.tool(), &command, output)?;
    Ok(format!("Cloned repository from {url} to {}.", args.string("dir")?))
}

pub(super) async fn diff(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    Git::open(args).await?.run(&["diff"]).await
}

pub(super) async fn reset(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let file = args.string("file")?;
    Git::open(args).await?.run(&["reset", "--", file]).await?;
    Ok(format!("Reset {file} in the working directory."))
}
