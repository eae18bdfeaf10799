//! System `git` invocations and working-tree status parsing

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::Error;

/// Phrase preceding the branch name in `git status` output
const BRANCH_MARKER: &str = "On branch";

/// Branch checked out in a working tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    Named(String),
    /// No "On branch" line was present (detached HEAD, rebase in progress, ...)
    Unknown,
}

impl Branch {
    pub fn name(&self) -> Option<&str> {
        match self {
            Branch::Named(name) => Some(name.as_str()),
            Branch::Unknown => None,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Named(name) => f.write_str(name),
            Branch::Unknown => f.write_str("unknown"),
        }
    }
}

/// Parsed `git status` of a cached clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    pub branch: Branch,
    pub untracked_files: Vec<String>,
    pub to_be_committed_files: Vec<String>,
    pub merge_required: bool,
    /// Unparsed command output
    pub raw: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Staged,
    Untracked,
    Other,
}

impl WorkingTreeStatus {
    /// Parse the long-format (human readable) output of `git status`.
    ///
    /// Expects the `C` locale; section headers are matched literally.
    pub fn parse(raw: &str) -> Self {
        let mut status = WorkingTreeStatus {
            branch: Branch::Unknown,
            untracked_files: Vec::new(),
            to_be_committed_files: Vec::new(),
            merge_required: false,
            raw: raw.to_string(),
        };
        let mut section = Section::Other;

        for line in raw.lines() {
            if status.branch == Branch::Unknown {
                if let Some((_, rest)) = line.split_once(BRANCH_MARKER) {
                    status.branch = Branch::Named(rest.trim().to_string());
                    continue;
                }
            }

            if line.starts_with("You have unmerged paths") || line.starts_with("Unmerged paths:") {
                status.merge_required = true;
            }

            if !line.starts_with(char::is_whitespace) && line.ends_with(':') {
                section = match line {
                    "Changes to be committed:" => Section::Staged,
                    "Untracked files:" => Section::Untracked,
                    _ => Section::Other,
                };
                continue;
            }

            // Entries are tab-indented; hints such as `(use "git add ...")` use spaces
            let Some(entry) = line.strip_prefix('\t') else {
                continue;
            };
            match section {
                Section::Staged => status.to_be_committed_files.push(staged_path(entry)),
                Section::Untracked => status.untracked_files.push(entry.trim().to_string()),
                Section::Other => {}
            }
        }

        status
    }
}

/// `new file:   a.txt` -> `a.txt`, `renamed:    a -> b` -> `b`
fn staged_path(entry: &str) -> String {
    let path = entry
        .split_once(':')
        .map(|(_, path)| path)
        .unwrap_or(entry)
        .trim();
    path.rsplit_once(" -> ")
        .map(|(_, to)| to)
        .unwrap_or(path)
        .to_string()
}

/// Raw output of `git diff` for a cached clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub raw: String,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

/// Clone `url` into `target_dir`.
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Personal access tokens
/// - Any authentication configured in ~/.gitconfig
///
/// The destination is never removed beforehand; callers decide whether a
/// clone is needed.
pub fn clone_into(url: &str, target_dir: &Path) -> Result<(), Error> {
    let clone_failed = |message: String, hint: Option<String>| Error::CloneFailed {
        url: url.to_string(),
        destination: target_dir.to_path_buf(),
        message,
        hint,
    };

    let output = Command::new("git")
        .arg("clone")
        .arg("--")
        .arg(url)
        .arg(target_dir)
        .output()
        .map_err(|e| clone_failed(e.to_string(), Some("Is git installed and on PATH?".to_string())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // Provide helpful hint for common auth failures
        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "Make sure you have access to the repository. For private repos, ensure an \
                 SSH key is added to ssh-agent or git credentials are configured"
                    .to_string(),
            )
        } else {
            None
        };

        return Err(clone_failed(stderr, hint));
    }

    Ok(())
}

/// Confirm that `path` is the top level of a git working tree
pub fn verify_repository(path: &Path) -> Result<PathBuf, Error> {
    let open_failed = |message: String| Error::Open {
        path: path.to_path_buf(),
        message,
    };

    let requested = fs::canonicalize(path).map_err(|e| open_failed(e.to_string()))?;
    let output = git_in(path, &["rev-parse", "--show-toplevel"])
        .map_err(|e| open_failed(e.to_string()))?;
    if !output.status.success() {
        return Err(open_failed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let toplevel = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let toplevel = fs::canonicalize(&toplevel).map_err(|e| open_failed(e.to_string()))?;
    if toplevel != requested {
        return Err(open_failed(format!(
            "directory belongs to the repository at {}",
            toplevel.display()
        )));
    }

    Ok(requested)
}

/// Run `git status` in `path` and parse the result
pub fn status(path: &Path) -> Result<WorkingTreeStatus, Error> {
    let raw = read_only_command(path, &["-c", "color.status=false", "status"], "status")?;
    Ok(WorkingTreeStatus::parse(&raw))
}

/// Run `git diff` in `path`
pub fn diff(path: &Path) -> Result<Diff, Error> {
    let raw = read_only_command(path, &["diff", "--no-color"], "diff")?;
    Ok(Diff { raw })
}

fn read_only_command(path: &Path, args: &[&str], name: &str) -> Result<String, Error> {
    let command_failed = |stderr: String| Error::GitCommand {
        command: name.to_string(),
        path: path.to_path_buf(),
        stderr,
    };

    let output = git_in(path, args).map_err(|e| command_failed(e.to_string()))?;
    if !output.status.success() {
        return Err(command_failed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn git_in(path: &Path, args: &[&str]) -> std::io::Result<Output> {
    Command::new("git")
        .arg("-C")
        .arg(path)
        .args(args)
        // Section headers are parsed literally
        .env("LC_ALL", "C")
        .output()
}
