use std::{process, sync::Arc};

use piazza::{
    application::{
        comments::CommentService,
        error::AppError,
        follows::FollowService,
        listing::ListingService,
        posts::PostService,
        profile::ProfileService,
        repos::{
            CommentsRepo, CommentsWriteRepo, FollowsRepo, FollowsWriteRepo, GroupsRepo,
            PostsRepo, PostsWriteRepo, ProfilesRepo, UsersRepo,
        },
    },
    cache::{CacheConfig, CacheState, PageCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState, IdentityState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    run_serve(settings).await
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let (http_state, identity_state, cache_state) = build_application_context(repositories, &settings);

    serve_http(&settings, http_state, identity_state, cache_state).await
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

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> (HttpState, IdentityState, Option<CacheState>) {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let profiles_repo: Arc<dyn ProfilesRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let comments_write_repo: Arc<dyn CommentsWriteRepo> = repositories.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repositories.clone();
    let follows_write_repo: Arc<dyn FollowsWriteRepo> = repositories.clone();

    let cache_config = CacheConfig::from(&settings.cache);
    let cache_state = cache_config.enabled.then(|| CacheState {
        cache: Arc::new(PageCache::new(&cache_config)),
        config: cache_config.clone(),
    });

    let http_state = HttpState {
        listing: Arc::new(ListingService::new(posts_repo.clone(), groups_repo.clone())),
        profiles: Arc::new(ProfileService::new(profiles_repo, posts_repo.clone())),
        posts: Arc::new(PostService::new(posts_repo.clone(), posts_write_repo)),
        comments: Arc::new(CommentService::new(
            posts_repo.clone(),
            comments_repo,
            comments_write_repo,
        )),
        follows: Arc::new(FollowService::new(
            users_repo.clone(),
            follows_repo,
            follows_write_repo,
        )),
        groups: groups_repo,
        posts_repo,
        db: repositories,
        login_url: settings.auth.login_url.clone(),
    };

    let identity_state = IdentityState {
        users: users_repo,
        identity_header: settings.auth.identity_header.clone(),
        login_url: settings.auth.login_url.clone(),
    };

    (http_state, identity_state, cache_state)
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    identity_state: IdentityState,
    cache_state: Option<CacheState>,
) -> Result<(), AppError> {
    let router = http::build_router(http_state, identity_state, cache_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "piazza::server",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install shutdown signal handler");
    }
}
