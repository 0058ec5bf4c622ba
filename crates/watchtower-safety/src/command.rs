//! `sanitizeCommand` (§4.1): a denylist substring scan that applies
//! unconditionally, followed by an allowlist-prefix fast path that is only
//! consulted when no shell operators are present and no override is active.

use crate::tables::{ALLOWLIST_PREFIXES, COMMAND_DENYLIST};

#[derive(Debug, Clone)]
pub enum CommandCheck {
    Safe,
    Unsafe { reason: String },
}

impl CommandCheck {
    pub fn is_safe(&self) -> bool {
        matches!(self, CommandCheck::Safe)
    }
}

/// Backticks are always forbidden (unconditional command substitution with
/// no escape hatch); `$()` is permitted and does not itself count as a
/// "shell operator" for the allowlist fast path, matching §4.1's explicit
/// carve-out. `;`, `&&`, `||`, `|` (outside pipeline-segment checks), and
/// redirection characters count as shell operators.
pub fn has_shell_operators(cmd: &str) -> bool {
    if cmd.contains('`') {
        return true;
    }
    const OPERATORS: &[&str] = &["&&", "||", ";", ">", "<", "&"];
    OPERATORS.iter().any(|op| cmd.contains(op))
}

fn is_allowlisted(segment: &str) -> bool {
    let lower = segment.trim().to_lowercase();
    ALLOWLIST_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

pub fn sanitize_command(cmd: &str, override_active: bool) -> CommandCheck {
    let trimmed = cmd.trim();
    if trimmed.is_empty() {
        return CommandCheck::Unsafe {
            reason: "empty command".to_string(),
        };
    }

    let lower = trimmed.to_lowercase();
    for (pattern, reason) in COMMAND_DENYLIST {
        if lower.contains(pattern) {
            return CommandCheck::Unsafe {
                reason: format!("blocked pattern: {reason}"),
            };
        }
    }

    if trimmed.contains('`') {
        return CommandCheck::Unsafe {
            reason: "backtick command substitution is forbidden".to_string(),
        };
    }

    if override_active {
        return CommandCheck::Safe;
    }

    if has_shell_operators(trimmed) {
        return CommandCheck::Unsafe {
            reason: "shell operators are not permitted outside an active override".to_string(),
        };
    }

    // Every pipeline segment after `|` must itself begin with an allowed
    // prefix.
    let segments: Vec<&str> = trimmed.split('|').collect();
    let all_allowed = segments.iter().all(|seg| is_allowlisted(seg));
    if all_allowed {
        CommandCheck::Safe
    } else {
        CommandCheck::Unsafe {
            reason: "command does not match an allowed prefix".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlisted_prefix_passes() {
        assert!(sanitize_command("ps aux", false).is_safe());
        assert!(sanitize_command("qm status 200", false).is_safe());
    }

    #[test]
    fn pipeline_requires_every_segment_allowlisted() {
        assert!(sanitize_command("ps aux | grep qemu", false).is_safe());
        assert!(!sanitize_command("ps aux | rm -rf /tmp", false).is_safe());
    }

    #[test]
    fn denylist_blocks_even_under_override() {
        let r = sanitize_command("rm -rf /", true);
        assert!(!r.is_safe());
    }

    #[test]
    fn override_bypasses_prefix_requirement_but_not_denylist() {
        assert!(sanitize_command("systemctl restart foo", true).is_safe());
        assert!(!sanitize_command("mkfs.ext4 /dev/sda1", true).is_safe());
    }

    #[test]
    fn backticks_always_forbidden() {
        assert!(!sanitize_command("echo `whoami`", false).is_safe());
        assert!(!sanitize_command("echo `whoami`", true).is_safe());
    }

    #[test]
    fn dollar_paren_is_not_a_shell_operator() {
        assert!(!has_shell_operators("echo $(date)"));
    }

    #[test]
    fn empty_command_is_unsafe() {
        assert!(!sanitize_command("   ", false).is_safe());
    }
}
