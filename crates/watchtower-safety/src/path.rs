use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::tables::PROTECTED_PATH_PREFIXES;

#[derive(Debug, Clone)]
pub enum PathCheck {
    Safe { resolved_path: String },
    Unsafe { reason: String },
}

impl PathCheck {
    pub fn is_safe(&self) -> bool {
        matches!(self, PathCheck::Safe { .. })
    }
}

/// `sanitizePath` (§4.1). Resolves a user-supplied path against an allow-list
/// of base directories, a deny-list of protected prefixes, an optional
/// containment base, URL-decoding, and symlink resolution — on the path
/// itself if it exists, or on its parent directory if it doesn't.
pub async fn sanitize_path(
    user_path: &str,
    base_dir: Option<&str>,
    allowed_base_dirs: &[String],
) -> PathCheck {
    let decoded = match percent_decode_str(user_path).decode_utf8() {
        Ok(s) => s.to_string(),
        Err(_) => {
            return PathCheck::Unsafe {
                reason: "malformed percent-encoding in path".to_string(),
            }
        }
    };

    if decoded.contains('\0') {
        return PathCheck::Unsafe {
            reason: "path contains a null byte".to_string(),
        };
    }

    let base = base_dir.unwrap_or("/");
    let resolved = resolve_against(base, &decoded);

    if let Err(reason) = check_prefixes_and_containment(&resolved, base_dir, allowed_base_dirs) {
        return PathCheck::Unsafe { reason };
    }

    // Resolve symlinks on the path if it exists; otherwise on its parent.
    let final_path = if tokio::fs::metadata(&resolved).await.is_ok() {
        match tokio::fs::canonicalize(&resolved).await {
            Ok(real) => real,
            Err(e) => {
                return PathCheck::Unsafe {
                    reason: format!("failed to resolve symlinks: {e}"),
                }
            }
        }
    } else {
        let parent = resolved.parent().unwrap_or(Path::new("/")).to_path_buf();
        match tokio::fs::canonicalize(&parent).await {
            Ok(real_parent) => {
                let basename = resolved.file_name().unwrap_or_default();
                real_parent.join(basename)
            }
            Err(_) => {
                // Parent doesn't exist either — nothing on disk to resolve
                // through yet; the pre-symlink path is the final answer.
                resolved.clone()
            }
        }
    };

    if let Err(reason) = check_prefixes_and_containment(&final_path, base_dir, allowed_base_dirs) {
        return PathCheck::Unsafe { reason };
    }

    PathCheck::Safe {
        resolved_path: final_path.to_string_lossy().to_string(),
    }
}

fn resolve_against(base: &str, user_path: &str) -> PathBuf {
    let p = Path::new(user_path);
    if p.is_absolute() {
        normalize(p)
    } else {
        normalize(&Path::new(base).join(p))
    }
}

/// Lexical `.`/`..` normalization without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn check_prefixes_and_containment(
    path: &Path,
    base_dir: Option<&str>,
    allowed_base_dirs: &[String],
) -> Result<(), String> {
    let path_str = path.to_string_lossy();

    for prefix in PROTECTED_PATH_PREFIXES {
        let bare = prefix.trim_end_matches('/');
        if path_str == *bare || (prefix.ends_with('/') && path_str.starts_with(prefix)) {
            return Err(format!("path is under the protected prefix '{prefix}'"));
        }
    }

    if let Some(base) = base_dir {
        let base_norm = base.trim_end_matches('/');
        if path_str != base_norm && !path_str.starts_with(&format!("{base_norm}/")) {
            return Err(format!("path escapes the required containment base '{base}'"));
        }
    }

    let within_allowed = allowed_base_dirs.iter().any(|dir| {
        let dir_norm = dir.trim_end_matches('/');
        path_str == dir_norm || path_str.starts_with(&format!("{dir_norm}/"))
    });
    if !within_allowed {
        return Err("path is outside every allowed base directory".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["/mnt/storage".to_string()]
    }

    #[tokio::test]
    async fn rejects_traversal_outside_allowed_dirs() {
        let r = sanitize_path("/mnt/storage/../../etc/passwd", None, &allowed()).await;
        assert!(!r.is_safe());
    }

    #[tokio::test]
    async fn accepts_plain_path_within_allowed_dir() {
        let r = sanitize_path("/mnt/storage/backups/db.sqlite", None, &allowed()).await;
        assert!(r.is_safe());
    }

    #[tokio::test]
    async fn rejects_null_byte() {
        let r = sanitize_path("/mnt/storage/foo\0bar", None, &allowed()).await;
        assert!(!r.is_safe());
    }

    #[tokio::test]
    async fn rejects_protected_prefix() {
        let r = sanitize_path("/etc/pve/priv/secret", None, &["/etc".to_string()]).await;
        assert!(!r.is_safe());
    }

    #[tokio::test]
    async fn rejects_containment_escape() {
        let r = sanitize_path(
            "/mnt/storage/other/file",
            Some("/mnt/storage/backups"),
            &allowed(),
        )
        .await;
        assert!(!r.is_safe());
    }
}
