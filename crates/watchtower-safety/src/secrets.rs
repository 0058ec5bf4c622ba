use crate::tables::{SECRET_BASENAMES, SENSITIVE_DIR_SEGMENTS};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SecretFileCheck {
    pub blocked: bool,
    pub reason: Option<String>,
}

/// `isSecretFile` (§4.1) — matches the file basename against a closed set of
/// secret patterns, and path segments against a closed set of sensitive
/// directories (ssh/git/gnupg/cloud-cli caches).
pub fn is_secret_file(path: &str) -> SecretFileCheck {
    let p = Path::new(path);

    if let Some(basename) = p.file_name().and_then(|n| n.to_str()) {
        let lower = basename.to_lowercase();
        for pattern in SECRET_BASENAMES {
            if lower == *pattern || lower.starts_with(pattern) {
                return SecretFileCheck {
                    blocked: true,
                    reason: Some(format!("'{basename}' matches a secret-file pattern")),
                };
            }
        }
    }

    let normalized = path.replace('\\', "/").to_lowercase();
    for segment in SENSITIVE_DIR_SEGMENTS {
        if normalized.contains(segment) {
            return SecretFileCheck {
                blocked: true,
                reason: Some(format!("path crosses the sensitive directory '{segment}'")),
            };
        }
    }

    SecretFileCheck {
        blocked: false,
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_ssh_private_key() {
        assert!(is_secret_file("/home/op/.ssh/id_rsa").blocked);
    }

    #[test]
    fn blocks_dotenv() {
        assert!(is_secret_file("/srv/app/.env").blocked);
    }

    #[test]
    fn allows_ordinary_file() {
        assert!(!is_secret_file("/mnt/storage/notes.txt").blocked);
    }
}
