use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::server::handlers::{
    add_rating, download_resource, filter_resources, get_resource, list_resources, list_tags,
    login, my_rating, rating_details, resource_readme, resource_source, task_archive,
    update_rating, upload, user_resources, whoami,
};
use crate::server::shutdown_signal;
use crate::server::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/resources", get(list_resources))
        .route("/resources/filter", get(filter_resources))
        .route("/resources/:id", get(get_resource))
        .route("/resources/:id/source", get(resource_source))
        .route("/resources/:id/readme", get(resource_readme))
        .route("/resources/:id/download", get(download_resource))
        .route(
            "/resources/:id/rating",
            get(rating_details).post(add_rating).put(update_rating),
        )
        .route("/resources/:id/rating/me", get(my_rating))
        .route("/tags", get(list_tags))
        .route("/users/:id/resources", get(user_resources))
        .route("/tasks/:name/archive", get(task_archive))
        .route("/upload", post(upload))
        .route("/oauth/github", post(login))
        .route("/whoami", get(whoami))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.server.address.clone();
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("starting server on: {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}
