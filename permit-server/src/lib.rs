mod app;
mod config;
mod controllers;
mod middlewares;
mod models;
mod routes;
mod services;
mod valid;
mod var;
mod version;

#[cfg(target_env = "msvc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

pub use app::{App, AppState};
pub use config::{load, AppConfig};
pub use models::{
    check::{
        parse_attributes, Attributes, AuthorizationQuery, AuthorizationResult,
        CheckResult, Resource, Subject,
    },
    user::User,
};
pub use routes::AppRouter;
pub use services::pdp::{Authorizer, DynAuthorizer, PdpClient};
use tokio::signal;
pub use version::version;

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
