//! External client traits (§6 "External Interfaces — consumed"). Each is a
//! small async trait with one `reqwest`-backed implementation: a thin struct
//! wrapping a `reqwest::Client` + base URL + credential, one method per REST
//! operation, a bounded `.timeout(...)` per request.
//!
//! Tool handlers and the runbook engine depend on the traits, never on the
//! concrete HTTP plumbing, so they can be faked in tests.

pub mod email;
pub mod hypervisor;
pub mod llm;
pub mod nvr;
pub mod remote_shell;
pub mod smart_home;
pub mod stt;
pub mod tts;

pub use email::{EmailClient, ShellEmailClient};
pub use hypervisor::{ClusterResource, HttpHypervisorClient, HypervisorClient, LifecycleAction, NodeStatus, TaskEntry};
pub use llm::{HttpLlmClient, LlmClient};
pub use nvr::{FaceEntry, HttpNvrClient, NvrClient};
pub use remote_shell::{RemoteShellClient, ShellResult, SshRemoteShellClient};
pub use smart_home::{HttpSmartHomeClient, SmartHomeClient};
pub use stt::{HttpSttClient, SttClient};
pub use tts::{HttpTtsClient, TtsClient, TtsEngine};
