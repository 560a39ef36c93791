pub mod health;
pub mod mcp_http;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(mcp_http::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::cors::build_cors_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use jobtread_mcp_runtime::{Config, Dispatcher, EnvSource};

    use crate::state::AppState;

    /// State with no credentials in scope, so every tool call is served from
    /// sample data without touching the network.
    pub fn demo_state() -> AppState {
        let env: Arc<dyn EnvSource> = Arc::new(HashMap::<String, String>::new());
        let config = Config {
            frame_interval: Duration::ZERO,
            ..Config::default()
        };
        AppState::new(Dispatcher::new(Arc::new(config), env).expect("dispatcher should build"))
    }
}
