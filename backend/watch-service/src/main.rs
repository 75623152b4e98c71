use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::time::Duration;
use watch_service::{
    cli::{self, Command},
    config::Config,
    logging,
    services::{
        auth::{AuthContext, FileSessionStore, LocalAuthProvider},
        format_duration, BroadcastController, SessionActor, SessionDeps, SessionPhase,
    },
    store::{RestRecordStore, SharedStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let Some(command) = cli::parse_args(std::env::args().skip(1)) else {
        eprintln!("{}", cli::USAGE);
        std::process::exit(2);
    };

    let cfg = Config::from_env().context("failed to load configuration")?;
    logging::init_tracing(cfg.log_json);

    let store: SharedStore = Arc::new(
        RestRecordStore::new(&cfg.store_url, &cfg.store_api_key, cfg.request_timeout())
            .context("failed to build record store client")?,
    );

    match command {
        Command::Watch {
            identifier,
            registration,
        } => watch(cfg, store, identifier, registration).await,
        Command::Broadcast { email, password } => broadcast(cfg, store, &email, &password).await,
        Command::Logout => {
            let auth = auth_context(&cfg);
            auth.initialize().await?;
            auth.logout().await;
            Ok(())
        }
    }
}

fn auth_context(cfg: &Config) -> AuthContext {
    AuthContext::new(
        Arc::new(LocalAuthProvider::default()),
        Arc::new(FileSessionStore::new(cfg.auth_session_path())),
    )
}

async fn watch(
    cfg: Config,
    store: SharedStore,
    identifier: String,
    registration: Option<cli::RegistrationArgs>,
) -> Result<()> {
    let session = SessionActor::spawn(Some(identifier), SessionDeps::simulated(store, &cfg)?);

    let resolved = session
        .wait_for(|snapshot| snapshot.phase != SessionPhase::Loading)
        .await?;

    match &resolved.phase {
        SessionPhase::NotFound { reason } => {
            tracing::warn!(%reason, "channel not found");
        }
        SessionPhase::Error { message } => {
            tracing::error!(%message, "failed to load channel");
        }
        _ => {
            if let Some(channel) = &resolved.channel {
                tracing::info!(
                    channel = %channel.display_name,
                    is_live = channel.is_live,
                    viewers = resolved.viewer_count,
                    "channel resolved"
                );
            }

            if let Some(args) = registration {
                match session
                    .register(&args.first_name, &args.last_name, &args.email)
                    .await
                {
                    Ok(identity) => tracing::info!(viewer = %identity.display_name(), "registered"),
                    Err(e) => tracing::warn!(error = %e, "registration rejected"),
                }
            }

            follow(&session).await;
        }
    }

    let last = session.teardown().await?;
    tracing::info!(messages = last.messages.len(), "session torn down");
    Ok(())
}

/// Log caption, mood and chat changes until Ctrl-C
async fn follow(session: &watch_service::services::SessionHandle) {
    let mut updates = session.subscribe();
    let mut seen_messages = updates.borrow().messages.len();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                for message in snapshot.messages.iter().skip(seen_messages) {
                    tracing::info!(author = %message.author, text = %message.text, "chat");
                }
                seen_messages = snapshot.messages.len();

                if let (Some(caption), Some(mood)) = (&snapshot.current_caption, snapshot.current_mood) {
                    tracing::debug!(%caption, mood = %mood, emoji = mood.emoji(), "telemetry");
                }
            }
        }
    }
}

async fn broadcast(cfg: Config, store: SharedStore, email: &str, password: &str) -> Result<()> {
    let auth = Arc::new(auth_context(&cfg));
    auth.initialize().await?;
    if auth.current_user().await.is_none() {
        auth.login(email, password).await?;
    }

    let controller = BroadcastController::new(
        store,
        auth.clone(),
        cfg.public_origin.clone(),
        cfg.request_timeout(),
    );
    controller.go_live().await?;
    tracing::info!(link = %controller.share_link().await?, "share this link with viewers");

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if let Some(elapsed) = controller.elapsed() {
                    tracing::debug!(elapsed = %format_duration(elapsed), "on air");
                }
            }
        }
    }

    let elapsed = controller.end().await?;
    tracing::info!(duration = %format_duration(elapsed), "stream ended");
    Ok(())
}
