use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buildbot_bridge::buildbot::BuildbotClient;
use buildbot_bridge::cache::RequestCache;
use buildbot_bridge::config::Config;
use buildbot_bridge::engine::{
    EngineRuntime, EngineSettings, ReconciliationEngine, TriggerSettings,
};
use buildbot_bridge::github::GitHubClient;
use buildbot_bridge::poller::{BuildWatcher, PullRequestWatcher};
use buildbot_bridge::server::{AppState, build_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buildbot_bridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let github = match GitHubClient::from_token(&config.github.token, config.github.repo.clone()) {
        Ok(client) => client,
        Err(err) => {
            error!("could not build GitHub client: {err}");
            std::process::exit(1);
        }
    };

    let buildbot = match BuildbotClient::new(
        &config.buildbot.base_url,
        config.buildbot.auth.clone(),
        &config.buildbot.change_hook_path,
        &config.buildbot.builder_name,
    ) {
        Ok(client) => client,
        Err(err) => {
            error!("could not build Buildbot client: {err}");
            std::process::exit(1);
        }
    };

    let triggers = TriggerSettings {
        bot_login: config.github.bot_login.clone(),
        trigger_string: config.github.trigger_string.clone(),
        empty_discussion: config.github.empty_discussion,
    };

    let engine = ReconciliationEngine::new(
        RequestCache::new(),
        buildbot.clone(),
        github.clone(),
        EngineSettings {
            project: config.buildbot.project.clone(),
            repository: config.buildbot.repository.clone(),
        },
    );

    let (engine_tx, engine_rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();

    let runtime = EngineRuntime::new(engine, github.clone(), triggers.clone());
    let engine_task = tokio::spawn(runtime.run(engine_rx, cancel.clone()));

    let pr_watcher = PullRequestWatcher::new(
        github,
        engine_tx.clone(),
        triggers,
        config.poll.github_interval_with_jitter(&config.github.repo),
    );
    tokio::spawn(pr_watcher.run(cancel.clone()));

    let build_watcher = BuildWatcher::new(
        buildbot,
        engine_tx.clone(),
        config.poll.buildbot_interval_with_jitter(&config.github.repo),
    );
    tokio::spawn(build_watcher.run(cancel.clone()));

    let app = build_router(AppState::new(
        config.server.webhook_secret.as_bytes().to_vec(),
        engine_tx,
    ));

    info!("listening on {}", config.server.listen_addr);

    let listener = match tokio::net::TcpListener::bind(config.server.listen_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("could not bind {}: {err}", config.server.listen_addr);
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
    {
        error!("server error: {err}");
    }

    cancel.cancel();
    let _ = engine_task.await;
}

/// Resolves on ctrl-c and cancels the worker tasks.
async fn shutdown_signal(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
    cancel.cancel();
}
