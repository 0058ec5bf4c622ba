use crate::error::{Result, SafetyError};

/// `sanitizeNodeName` (§4.1) — node names are hostname-like tokens used to
/// build hypervisor/SSH call targets; reject anything that could smuggle a
/// path separator or shell metacharacter into a downstream URL or command.
pub fn sanitize_node_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SafetyError::InvalidNodeName("empty node name".to_string()));
    }
    if trimmed.len() > 63 {
        return Err(SafetyError::InvalidNodeName("node name too long".to_string()));
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(SafetyError::InvalidNodeName(format!(
            "'{trimmed}' contains characters outside [A-Za-z0-9-_]"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_hostnames() {
        assert_eq!(sanitize_node_name("pve-node1").unwrap(), "pve-node1");
    }

    #[test]
    fn rejects_path_traversal_attempt() {
        assert!(sanitize_node_name("../etc").is_err());
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(sanitize_node_name("node; rm -rf /").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(sanitize_node_name("   ").is_err());
    }
}
