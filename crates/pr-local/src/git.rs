//! Shelling out to `git` for the repo under review. Synchronous
//! `std::process::Command`, explicit exit-code branching where git gives
//! one meaning (diff/diff-index: 0/1/other), `anyhow`-contexted errors
//! carrying captured stderr — the same idiom this codebase already used
//! for its one other git wrapper, generalized from session-bookkeeping
//! commits to reading the target repo's working tree.

use anyhow::{Context, Result, bail};
use pr_core::model::DiffStats;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn run_git(repo_root: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))
}

fn stdout_trimmed(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Discover the git root enclosing `path` via `git rev-parse --show-toplevel`.
pub fn discover_repo_root(path: &Path) -> Result<PathBuf> {
    let output = run_git(path, &["rev-parse", "--show-toplevel"])?;
    if !output.status.success() {
        bail!(
            "{} is not inside a git repository: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(PathBuf::from(stdout_trimmed(&output)))
}

pub fn head_sha(repo_root: &Path) -> Result<String> {
    let output = run_git(repo_root, &["rev-parse", "HEAD"])?;
    if !output.status.success() {
        bail!("git rev-parse HEAD failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(stdout_trimmed(&output))
}

/// `None` in detached-HEAD state.
pub fn current_branch(repo_root: &Path) -> Result<Option<String>> {
    let output = run_git(repo_root, &["symbolic-ref", "--short", "-q", "HEAD"])?;
    if !output.status.success() {
        return Ok(None);
    }
    let branch = stdout_trimmed(&output);
    Ok(if branch.is_empty() { None } else { Some(branch) })
}

/// Best-effort `owner/name` parsed from `remote.origin.url`; `None` when
/// there is no origin remote or the URL doesn't parse.
pub fn repository_identifier(repo_root: &Path) -> Option<String> {
    let output = run_git(repo_root, &["config", "--get", "remote.origin.url"]).ok()?;
    if !output.status.success() {
        return None;
    }
    let remote = stdout_trimmed(&output);
    parse_owner_repo(&remote)
}

fn parse_owner_repo(remote: &str) -> Option<String> {
    let trimmed = remote.trim().trim_end_matches(".git");
    let path = if let Some(rest) = trimmed.strip_prefix("git@") {
        rest.split_once(':').map(|(_, path)| path)?
    } else if let Some(idx) = trimmed.find("://") {
        let after_scheme = &trimmed[idx + 3..];
        let after_host = after_scheme.split_once('/')?.1;
        after_host
    } else {
        return None;
    };
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    if segments.len() >= 2 {
        let owner = segments[segments.len() - 2];
        let name = segments[segments.len() - 1];
        if !owner.is_empty() && !name.is_empty() {
            return Some(format!("{owner}/{name}"));
        }
    }
    None
}

/// Tracked-change diff text (`git diff HEAD`), plus untracked file paths
/// synthesized as if newly added.
pub fn working_tree_diff(repo_root: &Path) -> Result<(String, Vec<String>)> {
    let diff_output = run_git(repo_root, &["diff", "HEAD", "--no-color"])?;
    match diff_output.status.code() {
        Some(0) | Some(1) => {}
        Some(code) => bail!(
            "git diff failed (exit {code}): {}",
            String::from_utf8_lossy(&diff_output.stderr)
        ),
        None => bail!("git diff terminated by signal"),
    }
    let diff_text = String::from_utf8_lossy(&diff_output.stdout).into_owned();

    let untracked_output =
        run_git(repo_root, &["ls-files", "--others", "--exclude-standard"])?;
    if !untracked_output.status.success() {
        bail!(
            "git ls-files failed: {}",
            String::from_utf8_lossy(&untracked_output.stderr)
        );
    }
    let untracked: Vec<String> = String::from_utf8_lossy(&untracked_output.stdout)
        .lines()
        .map(str::to_string)
        .filter(|l| !l.is_empty())
        .collect();

    Ok((diff_text, untracked))
}

/// Counts backing [`DiffStats`]: tracked files changed against HEAD, staged
/// vs. unstaged among those, and untracked file count.
pub fn diff_stats(repo_root: &Path, untracked: &[String]) -> Result<DiffStats> {
    let tracked = run_git(repo_root, &["diff", "HEAD", "--name-only"])?;
    if !tracked.status.success() {
        bail!("git diff --name-only failed: {}", String::from_utf8_lossy(&tracked.stderr));
    }
    let tracked_changes = String::from_utf8_lossy(&tracked.stdout).lines().filter(|l| !l.is_empty()).count() as u32;

    let staged = run_git(repo_root, &["diff", "--cached", "--name-only"])?;
    if !staged.status.success() {
        bail!("git diff --cached --name-only failed: {}", String::from_utf8_lossy(&staged.stderr));
    }
    let staged_changes = String::from_utf8_lossy(&staged.stdout).lines().filter(|l| !l.is_empty()).count() as u32;

    let unstaged = run_git(repo_root, &["diff", "--name-only"])?;
    if !unstaged.status.success() {
        bail!("git diff --name-only failed: {}", String::from_utf8_lossy(&unstaged.stderr));
    }
    let unstaged_changes = String::from_utf8_lossy(&unstaged.stdout).lines().filter(|l| !l.is_empty()).count() as u32;

    Ok(DiffStats {
        tracked_changes,
        untracked_files: untracked.len() as u32,
        staged_changes,
        unstaged_changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_owner_repo_https() {
        assert_eq!(
            parse_owner_repo("https://github.com/acme/widgets.git"),
            Some("acme/widgets".to_string())
        );
    }

    #[test]
    fn parse_owner_repo_ssh() {
        assert_eq!(
            parse_owner_repo("git@github.com:acme/widgets.git"),
            Some("acme/widgets".to_string())
        );
    }

    #[test]
    fn parse_owner_repo_with_credentials() {
        assert_eq!(
            parse_owner_repo("https://token@github.com/acme/widgets.git"),
            Some("acme/widgets".to_string())
        );
    }

    #[test]
    fn parse_owner_repo_rejects_malformed() {
        assert_eq!(parse_owner_repo("not a url"), None);
    }

    #[test]
    fn discover_repo_root_and_head_sha_on_a_real_repo() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        Command::new("git").arg("init").current_dir(root).output().unwrap();
        Command::new("git").args(["config", "user.email", "t@example.com"]).current_dir(root).output().unwrap();
        Command::new("git").args(["config", "user.name", "t"]).current_dir(root).output().unwrap();
        std::fs::write(root.join("a.txt"), "hello").unwrap();
        Command::new("git").args(["add", "."]).current_dir(root).output().unwrap();
        Command::new("git").args(["commit", "-m", "init"]).current_dir(root).output().unwrap();

        let discovered = discover_repo_root(root).unwrap();
        assert_eq!(discovered.canonicalize().unwrap(), root.canonicalize().unwrap());
        let sha = head_sha(root).unwrap();
        assert_eq!(sha.len(), 40);
    }

    #[test]
    fn working_tree_diff_reports_untracked_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        Command::new("git").arg("init").current_dir(root).output().unwrap();
        Command::new("git").args(["config", "user.email", "t@example.com"]).current_dir(root).output().unwrap();
        Command::new("git").args(["config", "user.name", "t"]).current_dir(root).output().unwrap();
        std::fs::write(root.join("a.txt"), "hello").unwrap();
        Command::new("git").args(["add", "."]).current_dir(root).output().unwrap();
        Command::new("git").args(["commit", "-m", "init"]).current_dir(root).output().unwrap();
        std::fs::write(root.join("b.txt"), "new file").unwrap();

        let (_, untracked) = working_tree_diff(root).unwrap();
        assert_eq!(untracked, vec!["b.txt".to_string()]);
    }
}
