use std::{process, str::FromStr, sync::Arc};

use plume::{
    application::{
        assistant::{AssistantService, DisabledGenerator, TextGenerator},
        auth::{AccessGuard, OwnerLookup, TokenIssuer, TokenValidator},
        content::{ContentCache, ContentStore},
        error::AppError,
        repos::{CountersRepo, PostsRepo, PostsWriteRepo, TagsRepo},
    },
    cache::CacheConfig,
    config::{self, IssueTokenArgs},
    domain::types::{Principal, Role},
    infra::{
        assistant::ChatCompletionsGenerator,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, HealthProbe},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::IssueToken(args) => run_issue_token(&settings, &args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_api_state(repositories, &settings)?;

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "Plume API listening");

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, http::build_router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_seconds = grace.as_secs(), "Graceful shutdown timed out; dropping open connections");
        }
    }

    info!("Plume API stopped");
    Ok(())
}

fn run_issue_token(settings: &config::Settings, args: &IssueTokenArgs) -> Result<(), AppError> {
    if args.subject <= 0 {
        return Err(AppError::validation("subject must be a positive user id"));
    }
    let role = Role::from_str(&args.role)
        .map_err(|()| AppError::validation(format!("unknown role `{}`", args.role)))?;

    let default_ttl = time::Duration::try_from(settings.auth.access_token_ttl)
        .map_err(|err| AppError::unexpected(format!("invalid token lifetime: {err}")))?;
    let issuer = TokenIssuer::new(settings.auth.token_secret.as_bytes(), default_ttl);
    let principal = Principal::new(args.subject, role);

    let token = match args.ttl_seconds {
        Some(seconds) => issuer.issue_with_ttl(principal, time::Duration::seconds(seconds)),
        None => issuer.issue(principal),
    }
    .map_err(|err| AppError::unexpected(format!("failed to issue token: {err}")))?;

    println!("{token}");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_api_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApiState, AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let tags_repo: Arc<dyn TagsRepo> = repositories.clone();
    let counters_repo: Arc<dyn CountersRepo> = repositories.clone();

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(ContentCache::new(cache_config.enabled));
    let content = Arc::new(ContentStore::new(
        posts_repo,
        posts_write_repo,
        tags_repo,
        counters_repo,
        cache,
        cache_config,
    ));

    let validator = TokenValidator::new(settings.auth.token_secret.as_bytes());
    let owners: Arc<dyn OwnerLookup> = content.clone();
    let guard = Arc::new(AccessGuard::new(validator, owners));

    let generator: Arc<dyn TextGenerator> =
        match ChatCompletionsGenerator::from_settings(&settings.assistant)? {
            Some(client) => Arc::new(client),
            None => {
                info!("Assistant API key not configured; suggestion endpoints are disabled");
                Arc::new(DisabledGenerator)
            }
        };
    let assistant = Arc::new(AssistantService::new(generator));

    let health: Arc<dyn HealthProbe> = repositories;

    Ok(ApiState {
        content,
        guard,
        assistant,
        health,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
