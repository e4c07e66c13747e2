use std::{env, net::SocketAddr};

use axum::Router;
use axum_login::AuthManagerLayerBuilder;
use dotenv::dotenv;
use redis::aio::MultiplexedConnection;
use sea_orm::DatabaseConnection;
use tower_sessions::{Expiry, SessionManagerLayer, cookie::time::Duration};
use tower_sessions_redis_store::{
    RedisStore,
    fred::prelude::{ClientLike, Config as FredConfig, Pool as FredPool},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

mod argon_hasher;
mod constants;
mod email_client;
mod entities;
mod login_system;
mod reset_token;
mod reset_token_test;
mod routes;
mod utils;
mod utils_test;

use email_client::EmailClientConfig;
use login_system::AuthBackend;
use routes::{
    application::application_router, category::category_router, dashboard::dashboard_router,
    otp::otp_router, password::password_router, post::post_router, user::user_router,
};

#[cfg(all(target_env = "musl", not(target_os = "macos")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: MultiplexedConnection,
    pub app_url: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::password::forgot_password,
        routes::password::validate_reset_token,
        routes::password::reset_password,
        routes::otp::send_otp,
        routes::otp::verify_otp,
        routes::user::register,
        routes::user::login,
        routes::user::logout,
        routes::user::profile,
        routes::post::list_posts,
        routes::post::create_post,
        routes::post::count_posts,
        routes::post::recommended_posts,
        routes::post::get_post,
        routes::post::update_post,
        routes::post::delete_post,
        routes::category::list_categories,
        routes::category::get_category,
        routes::category::create_category,
        routes::category::update_category,
        routes::category::delete_category,
        routes::application::create_application,
        routes::application::list_applications,
        routes::application::count_applications,
        routes::application::get_application,
        routes::application::update_application_status,
        routes::application::delete_application,
        routes::dashboard::dashboard_stats,
    ),
    tags(
        (name = "Password", description = "Password reset token lifecycle"),
        (name = "Otp", description = "Email verification codes"),
        (name = "User", description = "Accounts and sessions"),
        (name = "Post", description = "Blog posts"),
        (name = "Category", description = "Blog categories"),
        (name = "Application", description = "J1 visa applications"),
        (name = "Dashboard", description = "Admin dashboard statistics"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let password_hashing_secret: String = env::var("PASSWORD_HASHING_SECRET").unwrap();

    let argon2_config = argon_hasher::Config {
        iterations: 4,
        parallelism: 4,
        memory_cost: 512,
        secret_key: password_hashing_secret.as_bytes().to_vec(),
    };
    argon_hasher::set_config(argon2_config);

    email_client::set_email_client_config(EmailClientConfig {
        smtp_server: env::var("SMTP_SERVER").unwrap(),
        smtp_port: env::var("SMTP_PORT").unwrap().parse().unwrap(),
        username: env::var("SMTP_USERNAME").unwrap(),
        password: env::var("SMTP_PASSWORD").unwrap(),
        from_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "WMA".to_string()),
    });

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = sea_orm::Database::connect(&database_url).await.unwrap();

    let redis_url = env::var("REDIS_URL").expect("REDIS_URL must be set");
    let redis_client = redis::Client::open(redis_url.as_str()).unwrap();
    let redis = redis_client
        .get_multiplexed_async_connection()
        .await
        .unwrap();

    let app_url = env::var("APP_URL").expect("APP_URL must be set");

    let app_state = AppState {
        db: db.clone(),
        redis: redis.clone(),
        app_url,
    };

    // Sessions live in Redis next to the OTP and rate-limit keys
    let session_pool = FredPool::new(
        FredConfig::from_url(&redis_url).unwrap(),
        None,
        None,
        None,
        6,
    )
    .unwrap();
    session_pool.connect();
    session_pool.wait_for_connect().await.unwrap();
    let session_store = RedisStore::new(session_pool);
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)));

    let auth_backend = AuthBackend::new(db, redis);
    let auth_layer = AuthManagerLayerBuilder::new(auth_backend, session_layer).build();

    let app = Router::new()
        .merge(password_router())
        .merge(otp_router())
        .nest("/user", user_router())
        .nest("/posts", post_router())
        .nest("/categories", category_router())
        .nest("/applications", application_router())
        .nest("/dashboard", dashboard_router());

    let app = Router::new()
        .nest("/api", app)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(auth_layer)
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::debug!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
