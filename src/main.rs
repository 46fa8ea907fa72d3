use std::{process, sync::Arc, time::Duration};

use canvass::{
    application::error::AppError,
    application::generation::SurveyGenerator,
    application::services::{Repositories, Services},
    cache::{CacheConfig, QueryCache},
    config,
    domain::{permissions::Principal, types::UserRole},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        generator,
        http::{self, ApiRateLimiter, ApiState},
        memory::InMemoryRepositories,
        telemetry,
    },
};
use canvass_api_types::ProfileSyncRequest;
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use uuid::Uuid;

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
        config::Command::IssueToken(args) => run_issue_token(settings, args).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let cache = Arc::new(QueryCache::with_system_clock(CacheConfig::from(
        &settings.cache,
    )));
    let generator = generator::from_settings(&settings.generator)?;

    let state = match settings.database.url.as_deref() {
        Some(url) => {
            let repositories = connect_postgres(&settings, url).await?;
            let services = build_services(repositories.clone(), cache, generator, &settings);
            ApiState::new(services, ApiRateLimiter::from_settings(&settings.rate_limit))
                .with_database(repositories)
        }
        None => {
            warn!(
                target: "canvass::bootstrap",
                "database url not configured; data is kept in memory and lost on exit"
            );
            let repositories = Arc::new(InMemoryRepositories::new());
            let services = build_services(repositories, cache, generator, &settings);
            ApiState::new(services, ApiRateLimiter::from_settings(&settings.rate_limit))
        }
    };

    serve_http(&settings, state).await
}

fn build_services<R: Repositories>(
    repositories: Arc<R>,
    cache: Arc<QueryCache>,
    generator: Arc<dyn SurveyGenerator>,
    settings: &config::Settings,
) -> Services {
    Services::build(
        repositories,
        cache,
        generator,
        settings.wizard.submit_timeout,
    )
}

async fn connect_postgres(
    settings: &config::Settings,
    url: &str,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = PostgresRepositories::connect(
        url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::from(err)))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_issue_token(
    settings: config::Settings,
    args: config::IssueTokenArgs,
) -> Result<(), AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("issue-token requires a database url"))?;
    let repositories = connect_postgres(&settings, url).await?;
    let cache = Arc::new(QueryCache::with_system_clock(CacheConfig::disabled()));
    let services = build_services(
        repositories,
        cache,
        generator::from_settings(&settings.generator)?,
        &settings,
    );

    let external_id = args
        .external_id
        .clone()
        .unwrap_or_else(|| args.email.trim().to_lowercase());
    let profile = ProfileSyncRequest {
        email: args.email.clone(),
        first_name: None,
        last_name: None,
    };
    let mut user = services
        .users
        .sync(&external_id, &profile, args.role)
        .await?;

    if user.role != args.role {
        // The operator running this command acts as an admin distinct from the target.
        let actor = Principal::new(Uuid::nil(), UserRole::Admin);
        user = services
            .users
            .update_role(&actor, user.id, args.role)
            .await?;
    }

    let expires_at = args
        .expires_in_days
        .map(|days| OffsetDateTime::now_utc() + time::Duration::days(i64::from(days)));
    let issued = services.tokens.issue(user.id, &args.name, expires_at).await?;

    info!(
        target: "canvass::tokens",
        user_id = %user.id,
        token_id = %issued.record.id,
        role = %user.role,
        "Access token issued"
    );
    println!("{}", issued.token);
    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("migrate requires a database url"))?;
    connect_postgres(&settings, url).await?;
    info!(target: "canvass::bootstrap", "Migrations applied");
    Ok(())
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target: "canvass::bootstrap", addr = %settings.server.addr, "Listening");

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

/// Resolves on ctrl-c, then arms a hard deadline for in-flight requests.
async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target: "canvass::bootstrap", error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(
        target: "canvass::bootstrap",
        grace_secs = grace.as_secs(),
        "Shutdown requested; draining connections"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target: "canvass::bootstrap", "Graceful shutdown window elapsed; exiting");
        process::exit(0);
    });
}
