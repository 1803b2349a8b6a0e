use laminark_types::ProjectTag;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Number of hex characters kept from the SHA-256 digest for a project tag (§3, §6).
const PROJECT_TAG_LEN: usize = 32;

/// Resolve the data directory Laminark's store lives under, by priority:
/// 1. Explicit path (with tilde expansion)
/// 2. `LAMINARK_PATH` environment variable (with tilde expansion)
/// 3. System data directory (recommended default)
/// 4. `~/.laminark` (fallback for systems without a standard data directory)
pub fn resolve_data_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("LAMINARK_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("laminark"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".laminark"));
    }

    Err(Error::Config(
        "Could not determine data directory: no HOME directory or system data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Compute the project tag from a project root using SHA-256, truncated to
/// the spec's 32-character width (§3, §6).
///
/// Canonicalizes the path before hashing so that symlinked and relative
/// representations of the same directory produce the same tag. If the path
/// is inside a git worktree, hashes the shared `.git` common directory
/// instead of the working-tree path, so every worktree of one repository
/// shares a project tag.
pub fn project_tag_from_root(project_root: &str) -> ProjectTag {
    let path = Path::new(project_root);

    let hash_target = if let Some(git_common_dir) = detect_git_common_dir(path) {
        git_common_dir
    } else {
        normalize_path(path)
    };

    let path_str = hash_target.to_string_lossy();
    let mut hasher = Sha256::new();
    hasher.update(path_str.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    ProjectTag::new(&digest[..PROJECT_TAG_LEN])
}

/// Detect the git common directory for worktree support.
///
/// Returns `Some(path)` only if the directory is part of a git worktree
/// (i.e. git-dir and git-common-dir differ). Returns `None` for non-git
/// directories or regular (non-worktree) repositories.
fn detect_git_common_dir(path: &Path) -> Option<PathBuf> {
    use std::process::Command;

    let git_dir = Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .current_dir(path)
        .output()
        .ok()?;

    let git_common_dir = Command::new("git")
        .args(["rev-parse", "--git-common-dir"])
        .current_dir(path)
        .output()
        .ok()?;

    if !git_dir.status.success() || !git_common_dir.status.success() {
        return None;
    }

    let git_dir_str = String::from_utf8_lossy(&git_dir.stdout);
    let git_common_dir_str = String::from_utf8_lossy(&git_common_dir.stdout);

    let git_dir_path = Path::new(git_dir_str.trim());
    let git_common_dir_path = Path::new(git_common_dir_str.trim());

    let git_dir_normalized = normalize_path(git_dir_path);
    let git_common_dir_normalized = normalize_path(git_common_dir_path);

    if git_dir_normalized != git_common_dir_normalized {
        Some(git_common_dir_normalized)
    } else {
        None
    }
}

/// Normalize a path for comparison (resolve to absolute, canonicalize if possible)
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// Discover the project root based on priority:
/// 1. `explicit_root` (e.g. a `--project-root` flag)
/// 2. `LAMINARK_PROJECT_ROOT` environment variable
/// 3. `hook_cwd` (the host's `cwd` field from the hook envelope), or the process cwd
pub fn discover_project_root(explicit_root: Option<&str>, hook_cwd: Option<&str>) -> Result<PathBuf> {
    if let Some(root) = explicit_root {
        return Ok(PathBuf::from(root));
    }

    if let Ok(env_root) = std::env::var("LAMINARK_PROJECT_ROOT") {
        return Ok(PathBuf::from(env_root));
    }

    if let Some(cwd) = hook_cwd {
        return Ok(PathBuf::from(cwd));
    }

    let cwd = std::env::current_dir()?;
    Ok(cwd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn project_tag_from_root_is_32_hex_chars() {
        let tag = project_tag_from_root("/tmp");
        assert_eq!(tag.as_str().len(), 32);
        assert!(tag.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn project_tag_from_root_is_deterministic() {
        let a = project_tag_from_root("/tmp");
        let b = project_tag_from_root("/tmp");
        assert_eq!(a, b);
    }

    #[test]
    fn project_tag_differs_for_different_roots() {
        let a = project_tag_from_root("/tmp");
        let b = project_tag_from_root("/var");
        assert_ne!(a, b);
    }

    #[test]
    fn detect_git_common_dir_non_git_is_none() {
        let result = detect_git_common_dir(Path::new("/tmp"));
        assert!(result.is_none());
    }

    #[test]
    fn git_worktrees_of_same_repo_share_a_project_tag() {
        use std::fs;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let bare_repo = temp_dir.path().join("repo.git");
        let wt1 = temp_dir.path().join("wt1");
        let wt2 = temp_dir.path().join("wt2");

        let init = Command::new("git")
            .args(["init", "--bare"])
            .arg(&bare_repo)
            .output()
            .unwrap();
        if !init.status.success() {
            return;
        }

        let temp_clone = temp_dir.path().join("temp_clone");
        let clone = Command::new("git")
            .args(["clone"])
            .arg(&bare_repo)
            .arg(&temp_clone)
            .output()
            .unwrap();
        if !clone.status.success() {
            return;
        }

        fs::write(temp_clone.join("README.md"), "# Test").unwrap();
        Command::new("git")
            .args(["add", "."])
            .current_dir(&temp_clone)
            .output()
            .unwrap();
        Command::new("git")
            .args(["commit", "-m", "Initial commit"])
            .current_dir(&temp_clone)
            .output()
            .unwrap();
        Command::new("git")
            .args(["push", "origin", "main"])
            .current_dir(&temp_clone)
            .output()
            .ok();
        Command::new("git")
            .args(["push", "origin", "master"])
            .current_dir(&temp_clone)
            .output()
            .ok();

        let branch_output = Command::new("git")
            .args(["branch", "--show-current"])
            .current_dir(&temp_clone)
            .output()
            .unwrap();
        let branch = String::from_utf8_lossy(&branch_output.stdout)
            .trim()
            .to_string();
        if branch.is_empty() {
            return;
        }

        let wt1_result = Command::new("git")
            .args(["worktree", "add"])
            .arg(&wt1)
            .arg(&branch)
            .current_dir(&bare_repo)
            .output()
            .unwrap();
        if !wt1_result.status.success() {
            return;
        }

        let wt2_result = Command::new("git")
            .args(["worktree", "add", "-b", "feature"])
            .arg(&wt2)
            .arg(&branch)
            .current_dir(&bare_repo)
            .output()
            .unwrap();
        if !wt2_result.status.success() {
            return;
        }

        let tag1 = project_tag_from_root(wt1.to_str().unwrap());
        let tag2 = project_tag_from_root(wt2.to_str().unwrap());

        assert_eq!(
            tag1, tag2,
            "worktrees of the same repository should share a project tag"
        );
    }
}
