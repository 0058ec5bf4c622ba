use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 7420;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const MAX_PAYLOAD_BYTES: usize = 128 * 1024;

/// Top-level config (`watchtower.toml` + `WATCHTOWER_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchtowerConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    pub providers: ProvidersConfig,
    pub hypervisor: HypervisorConfig,
    #[serde(default)]
    pub smart_home: Option<SmartHomeConfig>,
    #[serde(default)]
    pub nvr: Option<NvrConfig>,
    pub email: EmailConfig,
}

impl Default for WatchtowerConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                port: DEFAULT_PORT,
                bind: DEFAULT_BIND.to_string(),
                auth: AuthConfig {
                    password: Some("change-me".to_string()),
                    token_ttl_days: 7,
                },
            },
            database: DatabaseConfig::default(),
            safety: SafetyConfig::default(),
            monitor: MonitorConfig::default(),
            session: SessionConfig::default(),
            audio: AudioConfig::default(),
            providers: ProvidersConfig::default(),
            hypervisor: HypervisorConfig {
                base_url: "https://pve.local:8006".to_string(),
                token: "changeme".to_string(),
            },
            smart_home: None,
            nvr: None,
            email: EmailConfig {
                relay_node: "pve".to_string(),
                from_address: "watchtower@localhost".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub password: Option<String>,
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Safety Kernel tunables (§4.1). The tier table and protected-resource table
/// themselves are compiled-in closed sets (`watchtower-safety::tables`); this
/// section only covers what's legitimately an operator knob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_approval_keyword")]
    pub approval_keyword: String,
    /// Allow-listed base directories for `sanitizePath` (§4.1 step 5).
    #[serde(default = "default_allowed_base_dirs")]
    pub allowed_base_dirs: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            approval_keyword: default_approval_keyword(),
            allowed_base_dirs: default_allowed_base_dirs(),
        }
    }
}

/// Autonomous Monitor tunables (§4.4, §9 Dynamic configuration).
///
/// `kill_switch` and `autonomy_level` are the *startup defaults* only; at
/// runtime they live in the `preferences` table and are read fresh on every
/// guardrail check, per spec.md §9.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_true")]
    pub kill_switch_default: bool,
    #[serde(default = "default_autonomy_level")]
    pub autonomy_level_default: i64,
    #[serde(default = "default_critical_secs")]
    pub critical_poll_secs: u64,
    #[serde(default = "default_important_secs")]
    pub important_poll_secs: u64,
    #[serde(default = "default_routine_secs")]
    pub routine_poll_secs: u64,
    #[serde(default = "default_background_secs")]
    pub background_poll_secs: u64,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: i64,
    #[serde(default = "default_rate_limit_max_attempts")]
    pub rate_limit_max_attempts: u32,
    #[serde(default = "default_blast_radius_staleness_secs")]
    pub blast_radius_staleness_secs: i64,
    #[serde(default = "default_email_rate_limit_secs")]
    pub email_rate_limit_secs: i64,
    #[serde(default = "default_audit_retention_days")]
    pub audit_retention_days: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            kill_switch_default: true,
            autonomy_level_default: default_autonomy_level(),
            critical_poll_secs: default_critical_secs(),
            important_poll_secs: default_important_secs(),
            routine_poll_secs: default_routine_secs(),
            background_poll_secs: default_background_secs(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max_attempts: default_rate_limit_max_attempts(),
            blast_radius_staleness_secs: default_blast_radius_staleness_secs(),
            email_rate_limit_secs: default_email_rate_limit_secs(),
            audit_retention_days: default_audit_retention_days(),
        }
    }
}

/// Session & Context Manager tunables (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_context_window")]
    pub context_window_tokens: usize,
    #[serde(default = "default_response_reserve")]
    pub response_reserve_tokens: usize,
    #[serde(default = "default_recent_ratio")]
    pub recent_ratio: f64,
    #[serde(default = "default_summarize_threshold")]
    pub summarize_threshold: usize,
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_window_tokens: default_context_window(),
            response_reserve_tokens: default_response_reserve(),
            recent_ratio: default_recent_ratio(),
            summarize_threshold: default_summarize_threshold(),
            keep_count: default_keep_count(),
        }
    }
}

/// Streaming Audio Pipeline tunables (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_tts_primary_deadline_ms")]
    pub tts_primary_deadline_ms: u64,
    #[serde(default = "default_tts_fallback_deadline_ms")]
    pub tts_fallback_deadline_ms: u64,
    #[serde(default = "default_tts_recovery_interval_secs")]
    pub tts_recovery_interval_secs: u64,
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,
    #[serde(default = "default_frame_samples")]
    pub frame_samples: usize,
    #[serde(default = "default_pre_roll_ms")]
    pub pre_roll_ms: u64,
    #[serde(default = "default_trailing_silence_ms")]
    pub trailing_silence_ms: u64,
    #[serde(default = "default_max_utterance_secs")]
    pub max_utterance_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            tts_primary_deadline_ms: default_tts_primary_deadline_ms(),
            tts_fallback_deadline_ms: default_tts_fallback_deadline_ms(),
            tts_recovery_interval_secs: default_tts_recovery_interval_secs(),
            sample_rate_hz: default_sample_rate_hz(),
            frame_samples: default_frame_samples(),
            pre_roll_ms: default_pre_roll_ms(),
            trailing_silence_ms: default_trailing_silence_ms(),
            max_utterance_secs: default_max_utterance_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub llm: LlmConfig,
    pub tts_primary: TtsConfig,
    pub tts_fallback: TtsConfig,
    pub stt: SttConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TtsConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SttConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypervisorConfig {
    pub base_url: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartHomeConfig {
    pub base_url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NvrConfig {
    pub base_url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Node the email delegate host runs on (sent via remote shell, §6).
    pub relay_node: String,
    pub from_address: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_token_ttl_days() -> u32 {
    7
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.watchtower/watchtower.db", home)
}
fn default_approval_keyword() -> String {
    "execute order 66".to_string()
}
fn default_allowed_base_dirs() -> Vec<String> {
    vec!["/mnt/storage".to_string(), "/tmp".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_autonomy_level() -> i64 {
    1 // ALERT — observe-and-notify until an operator opts further in.
}
fn default_critical_secs() -> u64 {
    12
}
fn default_important_secs() -> u64 {
    32
}
fn default_routine_secs() -> u64 {
    300
}
fn default_background_secs() -> u64 {
    1800
}
fn default_rate_limit_window_secs() -> i64 {
    3600
}
fn default_rate_limit_max_attempts() -> u32 {
    3
}
fn default_blast_radius_staleness_secs() -> i64 {
    600
}
fn default_email_rate_limit_secs() -> i64 {
    300
}
fn default_audit_retention_days() -> i64 {
    30
}
fn default_context_window() -> usize {
    8192 // conservative value per §9 Open Questions
}
fn default_response_reserve() -> usize {
    1024
}
fn default_recent_ratio() -> f64 {
    0.7
}
fn default_summarize_threshold() -> usize {
    25
}
fn default_keep_count() -> usize {
    10
}
fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_model() -> String {
    "llama3".to_string()
}
fn default_tts_primary_deadline_ms() -> u64 {
    3_000
}
fn default_tts_fallback_deadline_ms() -> u64 {
    10_000
}
fn default_tts_recovery_interval_secs() -> u64 {
    30
}
fn default_sample_rate_hz() -> u32 {
    16_000
}
fn default_frame_samples() -> usize {
    512
}
fn default_pre_roll_ms() -> u64 {
    500
}
fn default_trailing_silence_ms() -> u64 {
    2_000
}
fn default_max_utterance_secs() -> u64 {
    30
}

impl WatchtowerConfig {
    /// Load config from a TOML file with `WATCHTOWER_*` env var overrides.
    ///
    /// Checks, in order: an explicit path argument, then
    /// `~/.watchtower/watchtower.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: WatchtowerConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("WATCHTOWER_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.watchtower/watchtower.toml", home)
}
