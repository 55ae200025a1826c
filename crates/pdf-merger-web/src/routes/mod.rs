//! HTTP route handlers for the PDF merger web application.
//!
//! HTML routes render Askama templates from the `templates` module and report
//! failures as flash messages; `/reorder` and `/api/*` answer JSON; the
//! `/download_file` route streams the merged PDF.

mod download;
mod errors;
mod merge;
mod pages;
mod recover;
mod upload;


pub use download::{download_file, download_page};
pub use errors::{handle_panic, not_found, render_too_large};
pub use merge::{api_merge, api_status, merge_page, process, reorder};
pub use pages::{clear_history, clear_session, debug, history, index};
pub use recover::{recover, recover_query, recovery_page};
pub use upload::{api_upload, upload};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    limit::RequestBodyLimitLayer, services::ServeDir, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tower_sessions::cookie::time;
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::state::AppState;

/// Build the application router with every route and middleware layer.
pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.service.config().server;
    let body_limit = server.max_body_bytes;
    let idle_minutes = i64::try_from(server.session_idle_minutes).unwrap_or(i64::MAX);
    let sessions = SessionManagerLayer::new(state.sessions.clone())
        .with_secure(server.secure_cookies)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(idle_minutes)));

    Router::new()
        // Pages
        .route("/", get(index))
        .route("/merge", get(merge_page))
        .route("/download/{filename}", get(download_page))
        .route("/recovery", get(recovery_page))
        .route("/history", get(history))
        .route("/debug", get(debug))
        // Form targets (POST-Redirect-GET)
        .route("/upload", post(upload))
        .route("/process", post(process))
        .route("/recover", get(recover_query))
        .route("/recover/{session_id}", get(recover))
        .route("/clear_history", post(clear_history))
        .route("/clear_session", get(clear_session))
        // JSON endpoints
        .route("/reorder", post(reorder))
        .route("/api/upload", post(api_upload))
        .route("/api/merge", post(api_merge))
        .route("/api/status/{task_id}", get(api_status))
        // Binary download
        .route("/download_file/{filename}", get(download_file))
        // Static files with Cache-Control: no-cache (cache but always revalidate via ETag)
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache"),
                ))
                .service(ServeDir::new(&state.static_dir)),
        )
        .fallback(not_found)
        // Middleware
        .layer(sessions)
        // Pages and redirects depend on session state; never serve them from cache
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            render_too_large,
        ))
        .layer(CompressionLayer::new())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
