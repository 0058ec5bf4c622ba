use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tracing::info;
use watchtower_audio::TtsPipeline;
use watchtower_core::config::WatchtowerConfig;
use watchtower_dispatch::clients::{
    EmailClient, HttpHypervisorClient, HttpLlmClient, HttpNvrClient, HttpSmartHomeClient, HttpSttClient, HttpTtsClient,
    ShellEmailClient, SshRemoteShellClient,
};
use watchtower_dispatch::tools::cluster::{ListNodesTool, ListVmsTool};
use watchtower_dispatch::tools::display::ShowNotificationTool;
use watchtower_dispatch::tools::face::{ListKnownFacesTool, RecognizeFaceTool};
use watchtower_dispatch::tools::files::{ReadFileTool, WriteFileTool};
use watchtower_dispatch::tools::lifecycle::{DeleteVmTool, RebootNodeTool, RebootVmTool, StartVmTool, StopVmTool};
use watchtower_dispatch::tools::smart_home::{LockDoorTool, SetClimateTool};
use watchtower_dispatch::tools::system::RunCommandTool;
use watchtower_dispatch::tools::transfer::DownloadFileTool;
use watchtower_dispatch::Dispatcher;
use watchtower_monitor::MonitorEngine;
use watchtower_safety::SafetyKernel;
use watchtower_sessions::{MemoryStore, SessionManager};

mod app;
mod auth;
mod error;
mod http;
mod ws;

use app::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "watchtower_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("WATCHTOWER_CONFIG").ok();
    let config = WatchtowerConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        WatchtowerConfig::default()
    });

    let core_conn = watchtower_core::db::open(&config.database.path)?;
    watchtower_sessions::db::init_db(&core_conn)?;
    watchtower_monitor::db::init_monitor_db(&core_conn)?;
    let db = Arc::new(Mutex::new(core_conn));

    let hypervisor: Arc<dyn watchtower_dispatch::clients::HypervisorClient> =
        Arc::new(HttpHypervisorClient::new(config.hypervisor.base_url.clone(), config.hypervisor.token.clone()));
    let shell: Arc<dyn watchtower_dispatch::clients::RemoteShellClient> = Arc::new(SshRemoteShellClient::new("root"));
    let email: Arc<dyn EmailClient> = Arc::new(ShellEmailClient::new(
        Arc::clone(&shell),
        config.email.relay_node.clone(),
        config.email.from_address.clone(),
    ));
    let llm: Arc<dyn watchtower_dispatch::clients::LlmClient> = Arc::new(HttpLlmClient::new(
        config.providers.llm.base_url.clone(),
        config.providers.llm.api_key.clone(),
        config.providers.llm.model.clone(),
    ));
    let tts_primary: Arc<dyn watchtower_dispatch::clients::TtsClient> =
        Arc::new(HttpTtsClient::new(config.providers.tts_primary.base_url.clone(), config.providers.tts_primary.api_key.clone()));
    let tts_fallback: Arc<dyn watchtower_dispatch::clients::TtsClient> =
        Arc::new(HttpTtsClient::new(config.providers.tts_fallback.base_url.clone(), config.providers.tts_fallback.api_key.clone()));
    let stt: Arc<dyn watchtower_dispatch::clients::SttClient> =
        Arc::new(HttpSttClient::new(config.providers.stt.base_url.clone(), config.providers.stt.api_key.clone()));

    let smart_home: Option<Arc<dyn watchtower_dispatch::clients::SmartHomeClient>> = config
        .smart_home
        .as_ref()
        .map(|c| Arc::new(HttpSmartHomeClient::new(c.base_url.clone(), c.token.clone())) as Arc<dyn watchtower_dispatch::clients::SmartHomeClient>);
    let nvr: Option<Arc<dyn watchtower_dispatch::clients::NvrClient>> = config
        .nvr
        .as_ref()
        .map(|c| Arc::new(HttpNvrClient::new(c.base_url.clone(), c.token.clone())) as Arc<dyn watchtower_dispatch::clients::NvrClient>);

    let kernel = Arc::new(SafetyKernel::new(config.safety.approval_keyword.clone(), config.safety.allowed_base_dirs.clone(), Arc::clone(&db)));
    let mut dispatcher = Dispatcher::new(Arc::clone(&kernel));
    dispatcher.register_tool(Arc::new(ListNodesTool::new(Arc::clone(&hypervisor))));
    dispatcher.register_tool(Arc::new(ListVmsTool::new(Arc::clone(&hypervisor))));
    dispatcher.register_tool(Arc::new(StartVmTool::new(Arc::clone(&hypervisor))));
    dispatcher.register_tool(Arc::new(StopVmTool::new(Arc::clone(&hypervisor))));
    dispatcher.register_tool(Arc::new(RebootVmTool::new(Arc::clone(&hypervisor))));
    dispatcher.register_tool(Arc::new(DeleteVmTool::new(Arc::clone(&hypervisor))));
    dispatcher.register_tool(Arc::new(RebootNodeTool::new(Arc::clone(&hypervisor))));
    dispatcher.register_tool(Arc::new(RunCommandTool::new(Arc::clone(&shell))));
    dispatcher.register_tool(Arc::new(ReadFileTool::new(Arc::clone(&shell), config.safety.allowed_base_dirs.clone())));
    dispatcher.register_tool(Arc::new(WriteFileTool::new(Arc::clone(&shell), config.safety.allowed_base_dirs.clone())));
    dispatcher.register_tool(Arc::new(DownloadFileTool::new(Arc::clone(&shell), config.safety.allowed_base_dirs.clone())));
    if let Some(smart_home) = smart_home.clone() {
        dispatcher.register_tool(Arc::new(SetClimateTool::new(Arc::clone(&smart_home))));
        dispatcher.register_tool(Arc::new(LockDoorTool::new(Arc::clone(&smart_home))));
        dispatcher.register_tool(Arc::new(ShowNotificationTool::new(Arc::clone(&smart_home))));
    }
    if let Some(nvr) = nvr.clone() {
        dispatcher.register_tool(Arc::new(RecognizeFaceTool::new(Arc::clone(&nvr))));
        dispatcher.register_tool(Arc::new(ListKnownFacesTool::new(Arc::clone(&nvr))));
    }
    let dispatcher = Arc::new(dispatcher);

    let sessions_conn = watchtower_core::db::open(&config.database.path)?;
    let sessions = Arc::new(SessionManager::new(sessions_conn, Arc::clone(&llm), config.session.clone())?);

    let memory_conn = watchtower_core::db::open(&config.database.path)?;
    let memory = Arc::new(MemoryStore::new(memory_conn));

    let tts = Arc::new(TtsPipeline::new(tts_primary, tts_fallback, config.audio.clone()));

    let (monitor_events_tx, _) = broadcast::channel::<watchtower_core::types::BroadcastEvent>(256);
    let monitor = Arc::new(MonitorEngine::new(
        Arc::clone(&db),
        Arc::clone(&hypervisor),
        Arc::clone(&dispatcher),
        Arc::clone(&email),
        monitor_events_tx,
        config.monitor.clone(),
    ));

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(Arc::clone(&monitor).run(shutdown_rx));

    let state = Arc::new(AppState {
        auth: auth::TokenAuthority::new(config.gateway.auth.token_ttl_days),
        db,
        dispatcher,
        sessions,
        memory,
        monitor,
        tts,
        stt,
        llm,
        hypervisor,
        email,
        nvr,
        smart_home,
        broadcaster: ws::broadcast::EventBroadcaster::new(),
        config,
    });

    let bind = state.config.gateway.bind.clone();
    let port = state.config.gateway.port;
    let router = app::build_router(Arc::clone(&state));

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("watchtower gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
