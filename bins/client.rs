use std::process::ExitCode;

use dotenvy::dotenv;
use models::LoginRequest;
use serde_json::json;
use service::runtime::ClientContext;
use tracing::{error, info, warn};
use uuid::Uuid;

fn init_logging() {
    // Load .env first so RUST_LOG / LOG_FORMAT take effect
    dotenv().ok();
    common::utils::logging::init_logging_from_env();
    info!(service = "client", event = "logger_init", "tracing subscriber initialized");
}

fn credentials_from_env() -> Option<LoginRequest> {
    let login_id = std::env::var("DAYFLOW_LOGIN_ID").ok().filter(|v| !v.is_empty())?;
    let password = std::env::var("DAYFLOW_PASSWORD").ok()?;
    Some(LoginRequest::new(login_id, password))
}

async fn run() -> anyhow::Result<ExitCode> {
    let cfg = configs::ClientConfig::load_and_validate()?;
    let ctx = ClientContext::build(cfg).await?;

    let snapshot = ctx.session.bootstrap().await;
    info!(service = "client", event = "bootstrap", phase = ?snapshot.phase(), "session bootstrapped");

    let mut exit = ExitCode::SUCCESS;
    if !snapshot.is_authenticated() {
        if let Some(request) = credentials_from_env() {
            let result = ctx.session.login(request).await;
            if let Some(message) = result.error_message() {
                warn!(service = "client", event = "login_failed", kind = ?result.failure_kind(), reason = message, "login failed");
                exit = ExitCode::FAILURE;
            }
        }
    }

    let notifications = match ctx.start_notifications() {
        Some(poller) => match poller.refresh_now().await {
            Ok(feed) => Some(json!({ "unread": feed.unread, "total": feed.items.len() })),
            Err(e) => {
                warn!(service = "client", event = "notifications_failed", error = %e, "notification fetch failed");
                None
            }
        },
        None => None,
    };

    let guards: Vec<_> = ctx
        .guard_decisions()
        .into_iter()
        .map(|(guard, decision)| json!({ "guard": guard, "decision": decision }))
        .collect();
    let report = json!({
        "session": ctx.session.snapshot(),
        "guards": guards,
        "notifications": notifications,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if std::env::var("DAYFLOW_LOGOUT").is_ok_and(|v| v == "1") {
        ctx.session.logout().await;
    }
    Ok(exit)
}

fn main() -> ExitCode {
    init_logging();

    let run_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "client", event = "panic", %run_id, pid, message = %info, "unhandled panic occurred");
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "client", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(service = "client", event = "start", %run_id, pid, version, "session client starting");
    rt.block_on(async {
        match run().await {
            Ok(code) => code,
            Err(e) => {
                error!(service = "client", event = "run_failed", error = %e, "session client failed");
                ExitCode::FAILURE
            }
        }
    })
}
