use std::fs;
use std::io;
use std::path::Path;

use crate::application::tooling::error::ToolInvokeError;
use crate::application::tooling::schema::ToolArgs;

const TREE_INDENT: usize = 4;

pub(super) async fn read(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let path = args.path("file_path")?;
    tokio::fs::read_to_string(&path).await.map_err(|error| {
        ToolInvokeError::execution(
            args.tool(),
            format!("cannot read '{}': {error}", path.display()),
        )
    })
}

pub(super) async fn write(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let path = args.path("file_path")?;
    let content = args.string("content")?;
    tokio::fs::write(&path, content).await.map_err(|error| {
        ToolInvokeError::execution(
            args.tool(),
            format!("cannot write '{}': {error}", path.display()),
        )
    })?;
    Ok(format!("Wrote content to {}.", args.string("file_path")?))
}

pub(super) async fn tree(args: &ToolArgs) -> Result<String, ToolInvokeError> {
    let root = args.path("dir_path")?;
    let tool = args.tool().to_string();

    let listing = tokio::task::spawn_blocking(move || {
        if !root.is_dir() {
            return Err(format!("not a directory: {}", root.display()));
        }
        let mut lines = Vec::new();
        walk(&root, 0, &mut lines)
            .map_err(|error| format!("cannot list '{}': {error}", root.display()))?;
        Ok(lines.join("\n"))
    })
    .await
    .map_err(|error| ToolInvokeError::execution(&tool, format!("directory walk aborted: {error}")))?;

    listing.map_err(|message| ToolInvokeError::execution(&tool, message))
}

/// Directory line first, then its files, then each subdirectory; names sorted.
fn walk(dir: &Path, depth: usize, lines: &mut Vec<String>) -> io::Result<()> {
    let label = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    lines.push(format!("{}{label}/", " ".repeat(TREE_INDENT * depth)));

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        } else {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    dirs.sort();

    let indent = " ".repeat(TREE_INDENT * (depth + 1));
    lines.extend(files.into_iter().map(|name| format!("{indent}{name}")));
    for child in dirs {
        walk(&child, depth + 1, lines)?;
    }
    Ok(())
}
