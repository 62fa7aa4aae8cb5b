use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod admin;
pub mod auth;
pub mod clients;
pub mod document_lists;
pub mod documents;
pub mod health;
pub mod requests;

/// Room for multipart framing around the largest accepted file, so oversize files reach
/// the upload validation instead of being cut off by the extractor.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024 * 1024;

fn cors_layer(allowed: Option<&String>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(err) => {
                        tracing::warn!(origin = %value, error = %err, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_ref());

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/client-login", post(auth::client_login))
        .route("/me", get(auth::me));

    let clients_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/:id",
            get(clients::get_client).patch(clients::update_client),
        );

    let document_lists_routes = Router::new()
        .route(
            "/",
            get(document_lists::list_lists).post(document_lists::create_list),
        )
        .route("/samples", post(document_lists::seed_samples))
        .route(
            "/:id",
            get(document_lists::get_list)
                .patch(document_lists::update_list)
                .delete(document_lists::delete_list),
        )
        .route("/:id/duplicate", post(document_lists::duplicate_list));

    let requests_routes = Router::new()
        .route(
            "/",
            get(requests::list_requests).post(requests::create_request),
        )
        .route("/mine", get(requests::my_request))
        .route("/:id", get(requests::get_request))
        .route("/:id/status", patch(requests::set_status))
        .route("/:id/send-email", post(requests::send_email))
        .route("/:id/documents", get(documents::list_documents))
        .route("/:id/documents/:slot", post(documents::upload_document))
        .route(
            "/:id/documents/:slot/validate",
            post(documents::validate_document),
        )
        .route(
            "/:id/documents/:slot/reject",
            post(documents::reject_document),
        )
        .route(
            "/:id/documents/:slot/download",
            get(documents::download_document),
        );

    let admin_routes =
        Router::new().route("/repair-ownership", post(admin::repair_ownership));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/clients", clients_routes)
        .nest("/api/document-lists", document_lists_routes)
        .nest("/api/requests", requests_routes)
        .nest("/api/admin", admin_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
