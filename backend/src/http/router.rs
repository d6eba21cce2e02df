//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Path segments shared between routes must use the same parameter name.
    let api_v1 = Router::new()
        // Session
        .route("/auth/me", get(handlers::me))
        .route("/auth/logout", post(handlers::logout))
        // Taxonomy
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/{key}",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route("/tags", get(handlers::list_tags).post(handlers::create_tag))
        .route(
            "/tags/{key}",
            get(handlers::get_tag).delete(handlers::delete_tag),
        )
        .route("/tags/{key}/articles", get(handlers::articles_by_tag))
        // Public articles
        .route("/articles", get(handlers::list_articles))
        .route("/articles/featured", get(handlers::featured_articles))
        .route("/articles/{slug}", get(handlers::get_article))
        // Editor
        .route(
            "/admin/articles",
            get(handlers::admin_list_articles).post(handlers::admin_create_article),
        )
        .route(
            "/admin/articles/{id}",
            get(handlers::admin_get_article)
                .patch(handlers::admin_update_article)
                .delete(handlers::admin_delete_article),
        )
        // Audience
        .route("/newsletter/subscribe", post(handlers::subscribe))
        .route("/newsletter/unsubscribe", post(handlers::unsubscribe))
        .route("/admin/newsletter/subscribers", get(handlers::list_subscribers))
        .route("/admin/newsletter/count", get(handlers::subscriber_count))
        .route("/contact", post(handlers::submit_contact))
        .route("/admin/contact", get(handlers::list_contact_messages))
        .route("/admin/contact/new-count", get(handlers::new_contact_count))
        .route("/admin/contact/{id}", patch(handlers::update_contact_status))
        // Analytics
        .route("/analytics/views", post(handlers::record_view))
        .route("/analytics/views/{id}", patch(handlers::update_view_progress))
        .route(
            "/analytics/likes",
            get(handlers::has_liked).post(handlers::toggle_like),
        )
        .route("/analytics/articles/{id}/stats", get(handlers::article_stats))
        .route("/analytics/popular", get(handlers::popular_articles))
        .route("/admin/stats", get(handlers::site_stats))
        .route("/rss/feed", get(handlers::rss_json));

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        .route("/api/articles/create", post(handlers::create_automated_article))
        .route("/rss.xml", get(handlers::rss_xml))
        .route("/sitemap.xml", get(handlers::sitemap_xml))
        .route("/robots.txt", get(handlers::robots_txt))
        .nest("/v1", api_v1)
        // Generated articles embed long markdown bodies.
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
