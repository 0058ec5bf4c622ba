//! Closed, compiled-in tables used by the safety kernel (§3, §4.1).
//!
//! These are deliberately not operator-extensible at runtime — closed sets —
//! unlike `SafetyConfig::allowed_base_dirs`, which is a genuine operator
//! knob read from TOML/env.

/// Protected resources: VM/container ids and service names that must never
/// be targeted by a tool call, override or not (protected-blocking is only
/// bypassable by an active override per the evaluation algorithm, §4.1).
pub const PROTECTED_VMIDS: &[&str] = &["100", "103"];
pub const PROTECTED_SERVICES: &[&str] = &["watchtower", "watchtower-gateway", "pve-cluster", "pvedaemon"];

/// Secret-file basename patterns (`isSecretFile`, §4.1).
pub const SECRET_BASENAMES: &[&str] = &[
    "id_rsa",
    "id_ed25519",
    "id_ecdsa",
    ".env",
    "shadow",
    "credentials",
    "authorized_keys",
    "known_hosts",
    ".npmrc",
    ".pgpass",
];

/// Sensitive path segments — any path whose components include one of these
/// is blocked regardless of basename.
pub const SENSITIVE_DIR_SEGMENTS: &[&str] = &[
    ".ssh",
    ".git",
    ".gnupg",
    ".aws",
    ".gcloud",
    ".kube",
    "pve/priv",
];

/// Protected path prefixes (trailing slash means "and subtree") for
/// `sanitizePath` step 3.
pub const PROTECTED_PATH_PREFIXES: &[&str] = &[
    "/etc/shadow",
    "/etc/pve/priv/",
    "/root/.ssh/",
    "/etc/kubernetes/",
];

/// Destructive command substrings, matched case-insensitively. These apply
/// even under an active override (§4.1 "Blocked patterns apply even under
/// override").
pub const COMMAND_DENYLIST: &[(&str, &str)] = &[
    ("rm -rf /", "recursive removal of the root filesystem"),
    ("rm -rf /*", "recursive removal of the root filesystem"),
    ("mkfs", "filesystem formatting"),
    ("dd if=", "raw disk write"),
    ("fdisk", "partition table edit"),
    ("parted", "partition table edit"),
    ("chmod -r 777 /", "mass permission change on root"),
    ("chown -r", "mass ownership change"),
    ("curl|sh", "pipe remote script directly into a shell"),
    ("curl | sh", "pipe remote script directly into a shell"),
    ("wget|sh", "pipe remote script directly into a shell"),
    ("wget | sh", "pipe remote script directly into a shell"),
    (":(){ :|:& };:", "fork bomb"),
    ("shutdown", "node-level halt"),
    ("poweroff", "node-level halt"),
    ("halt", "node-level halt"),
    ("reboot now", "node-level halt"),
    ("> /dev/sda", "raw device overwrite"),
];

/// Allowed command prefixes — a closed list of read/monitor/Proxmox/Docker/
/// systemd utilities. Checked against the trimmed, lower-cased command (or
/// each pipeline segment after `|`).
pub const ALLOWLIST_PREFIXES: &[&str] = &[
    "ls", "cat", "grep", "head", "tail", "ps", "top", "htop", "df", "du",
    "free", "uptime", "who", "w ", "uname", "vmstat", "iostat", "netstat",
    "ss ", "ping", "traceroute", "journalctl", "systemctl status",
    "systemctl is-active", "systemctl list-units",
    "docker ps", "docker logs", "docker inspect", "docker stats",
    "qm list", "qm status", "qm config",
    "pct list", "pct status", "pct config",
    "pvesh get",
];
