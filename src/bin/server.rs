// ABOUTME: Process entry point — wires config, tools, pools, auth, and the selected transport
// ABOUTME: Exit codes per spec §6.3: 0 success, 1 invalid args/fatal startup, 2 tools-path inaccessible

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ibmi_mcp_server::auth::{reap_forever, AuthSessionManager, KeyPair};
use ibmi_mcp_server::cli::{exit_codes, Cli};
use ibmi_mcp_server::config::environment::{ServerConfig, Transport};
use ibmi_mcp_server::config::{specifier_from_path_arg, ConfigLoader};
use ibmi_mcp_server::db::SourcePoolManager;
use ibmi_mcp_server::http::{self, HttpState};
use ibmi_mcp_server::mcp::{transport_stdio, ServerState};
use ibmi_mcp_server::tools::{compile_all, filter_for_toolsets, reload_registry, ToolRegistry};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to read environment configuration: {}", e.message);
            return ExitCode::from(exit_codes::INVALID_ARGS_OR_FATAL_STARTUP as u8);
        }
    };
    cli.apply_overrides(&mut config);
    init_tracing(config.log_level.to_tracing_level());

    let Some(tools_path) = config.tools_path.clone() else {
        eprintln!("no tools path configured: pass --tools or set TOOLS_YAML_PATH");
        return ExitCode::from(exit_codes::INVALID_ARGS_OR_FATAL_STARTUP as u8);
    };

    let specifiers = specifier_from_path_arg(&tools_path);
    let mut config_loader = ConfigLoader::new(specifiers, config.merge_options);
    if let Err(e) = config_loader.start_watching() {
        tracing::warn!(error = %e.message, "failed to start config file watcher, continuing without it");
    }
    let reload_rx = config_loader.subscribe_reloads();
    let config_loader = Arc::new(config_loader);

    let merged = match config_loader.load() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("failed to load tool configuration: {}", e.message);
            if e.message.contains("not found") {
                return ExitCode::from(exit_codes::TOOLS_PATH_INACCESSIBLE as u8);
            }
            return ExitCode::from(exit_codes::INVALID_ARGS_OR_FATAL_STARTUP as u8);
        }
    };

    let (tools, index) = match compile_all(&merged) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("failed to compile tools: {}", e.message);
            return ExitCode::from(exit_codes::INVALID_ARGS_OR_FATAL_STARTUP as u8);
        }
    };

    if cli.list_toolsets {
        print_toolsets(&index);
        return ExitCode::from(exit_codes::SUCCESS as u8);
    }

    let registry = Arc::new(ToolRegistry::empty());
    let registered = filter_for_toolsets(tools, &index, &config.selected_toolsets);
    registry.swap(registered, index);

    let pools = Arc::new(SourcePoolManager::new(merged.sources.clone()));

    let watcher_task = reload_rx.map(|rx| {
        tokio::spawn(run_reload_consumer(
            rx,
            config_loader.clone(),
            pools.clone(),
            registry.clone(),
            config.selected_toolsets.clone(),
        ))
    });

    let (auth_manager, keypair, reaper) = if config.auth.enabled {
        let keypair = match KeyPair::load_or_generate(&config.auth) {
            Ok(kp) => Arc::new(kp),
            Err(e) => {
                eprintln!("failed to load or generate auth keypair: {}", e.message);
                return ExitCode::from(exit_codes::INVALID_ARGS_OR_FATAL_STARTUP as u8);
            }
        };
        let manager = Arc::new(AuthSessionManager::new(config.auth.clone()));
        let reaper = tokio::spawn(reap_forever(manager.clone()));
        (Some(manager), Some(keypair), Some(reaper))
    } else {
        (None, None, None)
    };

    let mcp_state = Arc::new(ServerState {
        registry: registry.clone(),
        pools: pools.clone(),
        auth: auth_manager.clone(),
        selected_toolsets: config.selected_toolsets.clone(),
    });

    let pools_for_shutdown = pools.clone();

    let result = match config.transport {
        Transport::Stdio => transport_stdio::run(&mcp_state).await.map_err(|e| e.to_string()),
        Transport::Http => run_http(&config, mcp_state, auth_manager.clone(), keypair, config_loader, registry, pools)
            .await
            .map_err(|e| e.to_string()),
    };

    if let Some(reaper) = reaper {
        reaper.abort();
    }
    if let Some(watcher_task) = watcher_task {
        watcher_task.abort();
    }
    if let Some(manager) = auth_manager {
        manager.shutdown().await;
    }
    pools_for_shutdown.close_all().await;

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("server exited with error: {e}");
            ExitCode::from(exit_codes::INVALID_ARGS_OR_FATAL_STARTUP as u8)
        }
    }
}

async fn run_http(
    config: &ServerConfig,
    mcp_state: Arc<ServerState>,
    auth_manager: Option<Arc<AuthSessionManager>>,
    keypair: Option<Arc<KeyPair>>,
    config_loader: Arc<ConfigLoader>,
    registry: Arc<ToolRegistry>,
    pools: Arc<SourcePoolManager>,
) -> Result<(), std::io::Error> {
    let http_state = Arc::new(HttpState {
        auth_manager,
        keypair,
        allow_http: config.auth.allow_http,
        config_loader,
        registry,
        pools: pools.clone(),
        selected_toolsets: config.selected_toolsets.clone(),
    });

    let router = http::build_router(mcp_state, http_state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "http transport listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Consume file-watcher reload events and re-resolve/recompile/swap the
/// tool registry on each one (spec §4.1 step 6, §5 "consumed on the main
/// configuration thread"). A lagged receiver just means a reload is
/// coalesced into the next tick; the cache was already invalidated.
async fn run_reload_consumer(
    mut rx: tokio::sync::broadcast::Receiver<ibmi_mcp_server::config::ReloadEvent>,
    config_loader: Arc<ConfigLoader>,
    pools: Arc<SourcePoolManager>,
    registry: Arc<ToolRegistry>,
    selected_toolsets: Vec<String>,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                tracing::info!(path = %event.path.display(), "config file changed, reloading");
                match reload_registry(&config_loader, &pools, &registry, &selected_toolsets).await {
                    Ok((tool_count, toolset_count)) => {
                        tracing::info!(tool_count, toolset_count, "config reloaded from file watcher");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e.message, "config reload from file watcher failed, keeping previous tool set");
                    }
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

fn print_toolsets(index: &ibmi_mcp_server::tools::ToolsetIndex) {
    for summary in index.summaries() {
        println!(
            "{}\t{}\t{} tool(s)",
            summary.name,
            summary.title.as_deref().unwrap_or("-"),
            summary.tool_count
        );
    }
}

fn init_tracing(level: tracing::Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
