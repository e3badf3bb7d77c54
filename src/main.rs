use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizbot::{
    api,
    config::{BotConfig, RuntimeEnv},
    engine::QuizEngine,
    error::ConfigError,
    irc::{IrcConfig, IrcConnection},
    lang::Locale,
    question::QuestionPool,
    selector::CooldownSelector,
    store::{JsonFileScoreStore, MemoryScoreStore, ScoreStore},
};

struct Setup {
    env: RuntimeEnv,
    config: BotConfig,
    pool: QuestionPool,
    locale: Locale,
    selector: CooldownSelector,
    token: String,
}

fn load_setup() -> Result<Setup, ConfigError> {
    let env = RuntimeEnv::from_env()?;
    let config = BotConfig::load(&env.config_path)?;
    let pool = QuestionPool::load(&env.questions_path)?;
    config.validate_for_pool(pool.len())?;
    tracing::debug!(
        "All available questions:\n{}",
        pool.iter()
            .map(|q| format!("  {}: {} {:?}", q.index, q.prompt, q.accepted_answers))
            .collect::<Vec<_>>()
            .join("\n")
    );

    let locale = match &env.lang_path {
        Some(path) => Locale::load(path)?,
        None => Locale::default(),
    };
    let selector = CooldownSelector::new(pool.len(), config.question_cooldown_percent)?;
    let token = env.load_token()?;

    Ok(Setup {
        env,
        config,
        pool,
        locale,
        selector,
        token,
    })
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizbot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quizbot...");

    // Refuse to run with undefined timing or selection
    let setup = match load_setup() {
        Ok(setup) => setup,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let scores: Arc<dyn ScoreStore> = match &setup.env.scores_path {
        Some(path) => {
            tracing::info!("Storing scores in {}", path.display());
            Arc::new(JsonFileScoreStore::new(path))
        }
        None => {
            tracing::warn!("No scores file configured, scores are kept in memory only");
            Arc::new(MemoryScoreStore::new())
        }
    };

    let connection = match IrcConnection::connect(&IrcConfig {
        addr: setup.env.irc_addr.clone(),
        nick: setup.config.identity.username.clone(),
        token: setup.token.clone(),
        channel: setup.config.channel_name.clone(),
    })
    .await
    {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!("Failed to connect to chat: {}", e);
            std::process::exit(1);
        }
    };

    let start_command = setup.config.admin_commands.start.clone();
    let engine = match QuizEngine::new(
        setup.config,
        setup.pool,
        setup.selector,
        setup.locale,
        Arc::new(connection.chat()),
        scores.clone(),
    ) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let quiz = engine.handle();

    if let Some(addr) = setup.env.api_addr {
        let app = api::router(api::ApiState {
            quiz: quiz.clone(),
            scores,
        });
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!("Admin API listening on http://{}", addr);
                tokio::spawn(async move {
                    if let Err(e) = axum::serve(listener, app).await {
                        tracing::error!("Admin API stopped: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to bind admin API on {}: {}", addr, e);
                std::process::exit(1);
            }
        }
    }

    let engine_task = tokio::spawn(engine.run());
    tracing::info!(
        "Bot running. Make sure to start it using \"{}\"",
        start_command
    );

    tokio::select! {
        result = connection.run(quiz.clone()) => {
            if let Err(e) = result {
                tracing::error!("Chat connection ended: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down");
        }
    }

    quiz.shutdown();
    let _ = engine_task.await;
}
