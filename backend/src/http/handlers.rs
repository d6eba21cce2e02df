//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use super::dto::{
    AdminArticlesQuery, AutomatedArticleResponse, ContactStatusRequest, FeedItem, FeedResponse,
    HealthResponse, LikeQuery, LimitQuery, RecordViewResponse, SubscribeRequest,
    SubscribersQuery, SuccessResponse, ToggleLikeRequest, UnsubscribeRequest,
};
use super::error::AppError;
use super::extract::{AdminUser, ApiKey, ClientInfo, MaybeUser};
use super::state::AppState;
use crate::api::*;
use crate::auth;
use crate::db::services as db_services;
use crate::feeds::{self, Channel, RSS_CONTENT_TYPE};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Open id used for automated content when no owner is configured.
pub const FALLBACK_OWNER_OPEN_ID: &str = "scheduled-task";

fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());
    feeds::base_url(state.config.site_url.as_deref(), host)
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and database is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Session
// =============================================================================

/// GET /v1/auth/me
pub async fn me(MaybeUser(user): MaybeUser) -> HandlerResult<Option<User>> {
    Ok(Json(user))
}

/// POST /v1/auth/logout
pub async fn logout() -> Response {
    (
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        Json(SuccessResponse::ok()),
    )
        .into_response()
}

// =============================================================================
// Categories & Tags
// =============================================================================

pub async fn list_categories(State(state): State<AppState>) -> HandlerResult<Vec<Category>> {
    Ok(Json(db_services::list_categories(state.repository.as_ref()).await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> HandlerResult<Option<Category>> {
    Ok(Json(
        db_services::get_category_by_slug(state.repository.as_ref(), &slug).await?,
    ))
}

pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(category): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let created = db_services::create_category(state.repository.as_ref(), category).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_category(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<CategoryId>,
    Json(update): Json<CategoryUpdate>,
) -> HandlerResult<Category> {
    Ok(Json(
        db_services::update_category(state.repository.as_ref(), id, update).await?,
    ))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<CategoryId>,
) -> HandlerResult<SuccessResponse> {
    db_services::delete_category(state.repository.as_ref(), id).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn list_tags(State(state): State<AppState>) -> HandlerResult<Vec<Tag>> {
    Ok(Json(db_services::list_tags(state.repository.as_ref()).await?))
}

/// GET /v1/tags/{slug}
///
/// Shares its path with `/v1/tags/{id}/articles`, so the segment is a slug here.
pub async fn get_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> HandlerResult<Option<Tag>> {
    Ok(Json(
        db_services::get_tag_by_slug(state.repository.as_ref(), &slug).await?,
    ))
}

pub async fn create_tag(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(tag): Json<NewTag>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    let created = db_services::create_tag(state.repository.as_ref(), tag).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<TagId>,
) -> HandlerResult<SuccessResponse> {
    db_services::delete_tag(state.repository.as_ref(), id).await?;
    Ok(Json(SuccessResponse::ok()))
}

// =============================================================================
// Articles
// =============================================================================

/// GET /v1/articles?categoryId&search&tagId&limit&offset
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> HandlerResult<Vec<Article>> {
    Ok(Json(
        db_services::list_articles(state.repository.as_ref(), query).await?,
    ))
}

pub async fn featured_articles(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> HandlerResult<Vec<Article>> {
    Ok(Json(
        db_services::featured_articles(state.repository.as_ref(), query.limit).await?,
    ))
}

/// GET /v1/articles/{slug}
///
/// `null` for unknown or unpublished slugs.
pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> HandlerResult<Option<ArticleDetail>> {
    Ok(Json(
        db_services::get_article_detail(state.repository.as_ref(), &slug).await?,
    ))
}

pub async fn articles_by_tag(
    State(state): State<AppState>,
    Path(id): Path<TagId>,
) -> HandlerResult<Vec<Article>> {
    Ok(Json(
        db_services::articles_by_tag(state.repository.as_ref(), id).await?,
    ))
}

pub async fn admin_list_articles(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<AdminArticlesQuery>,
) -> HandlerResult<Vec<Article>> {
    Ok(Json(
        db_services::list_all_articles(state.repository.as_ref(), query.status).await?,
    ))
}

pub async fn admin_get_article(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<ArticleId>,
) -> HandlerResult<Option<ArticleDetail>> {
    Ok(Json(
        db_services::get_article_for_admin(state.repository.as_ref(), id).await?,
    ))
}

pub async fn admin_create_article(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Json(request): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<Article>), AppError> {
    let article = db_services::create_article(state.repository.as_ref(), request, user.id).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn admin_update_article(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<ArticleId>,
    Json(request): Json<UpdateArticleRequest>,
) -> HandlerResult<Article> {
    Ok(Json(
        db_services::update_article(state.repository.as_ref(), id, request).await?,
    ))
}

pub async fn admin_delete_article(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<ArticleId>,
) -> HandlerResult<SuccessResponse> {
    db_services::delete_article(state.repository.as_ref(), id).await?;
    Ok(Json(SuccessResponse::ok()))
}

// =============================================================================
// Newsletter & Contact
// =============================================================================

pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> HandlerResult<SuccessResponse> {
    db_services::subscribe(
        state.repository.as_ref(),
        &request.email,
        request.name.as_deref(),
    )
    .await?;
    Ok(Json(SuccessResponse::with_message("Inscription réussie!")))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> HandlerResult<SuccessResponse> {
    db_services::unsubscribe(state.repository.as_ref(), &request.email).await?;
    Ok(Json(SuccessResponse::with_message("Désinscription réussie.")))
}

pub async fn list_subscribers(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<SubscribersQuery>,
) -> HandlerResult<Vec<NewsletterSubscriber>> {
    Ok(Json(
        db_services::list_subscribers(state.repository.as_ref(), query.active_only).await?,
    ))
}

pub async fn subscriber_count(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> HandlerResult<i64> {
    Ok(Json(
        db_services::subscriber_count(state.repository.as_ref()).await?,
    ))
}

pub async fn submit_contact(
    State(state): State<AppState>,
    Json(message): Json<NewContactMessage>,
) -> HandlerResult<SuccessResponse> {
    db_services::submit_contact(state.repository.as_ref(), message).await?;
    Ok(Json(SuccessResponse::with_message("Message envoyé avec succès!")))
}

pub async fn list_contact_messages(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> HandlerResult<Vec<ContactMessage>> {
    Ok(Json(
        db_services::list_contact_messages(state.repository.as_ref()).await?,
    ))
}

pub async fn update_contact_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<ContactMessageId>,
    Json(request): Json<ContactStatusRequest>,
) -> HandlerResult<SuccessResponse> {
    db_services::update_contact_status(state.repository.as_ref(), id, request.status).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn new_contact_count(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> HandlerResult<i64> {
    Ok(Json(
        db_services::new_contact_count(state.repository.as_ref()).await?,
    ))
}

// =============================================================================
// Analytics
// =============================================================================

/// POST /v1/analytics/views
///
/// The user agent falls back to the request header when the body omits it.
pub async fn record_view(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    client: ClientInfo,
    Json(mut request): Json<RecordViewRequest>,
) -> HandlerResult<RecordViewResponse> {
    if request.user_agent.is_none() {
        request.user_agent = client.user_agent;
    }
    let view = db_services::record_view(
        state.repository.as_ref(),
        request,
        user.map(|u| u.id),
        client.ip.as_deref(),
    )
    .await?;
    Ok(Json(RecordViewResponse {
        success: true,
        view_id: view.id,
    }))
}

pub async fn update_view_progress(
    State(state): State<AppState>,
    Path(id): Path<ViewId>,
    Json(progress): Json<ViewProgress>,
) -> HandlerResult<SuccessResponse> {
    db_services::update_view_progress(state.repository.as_ref(), id, progress).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(request): Json<ToggleLikeRequest>,
) -> HandlerResult<LikeToggle> {
    Ok(Json(
        db_services::toggle_like(
            state.repository.as_ref(),
            request.article_id,
            &request.visitor_id,
            user.map(|u| u.id),
        )
        .await?,
    ))
}

pub async fn has_liked(
    State(state): State<AppState>,
    Query(query): Query<LikeQuery>,
) -> HandlerResult<bool> {
    Ok(Json(
        db_services::has_liked(state.repository.as_ref(), query.article_id, &query.visitor_id)
            .await?,
    ))
}

pub async fn article_stats(
    State(state): State<AppState>,
    Path(id): Path<ArticleId>,
) -> HandlerResult<Stats> {
    Ok(Json(
        db_services::stats(state.repository.as_ref(), Some(id)).await?,
    ))
}

pub async fn site_stats(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> HandlerResult<Stats> {
    Ok(Json(db_services::stats(state.repository.as_ref(), None).await?))
}

pub async fn popular_articles(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> HandlerResult<Vec<Article>> {
    Ok(Json(
        db_services::popular_articles(state.repository.as_ref(), query.limit).await?,
    ))
}

// =============================================================================
// Feeds
// =============================================================================

/// GET /v1/rss/feed
pub async fn rss_json(State(state): State<AppState>) -> HandlerResult<FeedResponse> {
    let articles =
        db_services::feed_articles(state.repository.as_ref(), state.config.rss_item_limit).await?;
    Ok(Json(FeedResponse {
        articles: articles.iter().map(FeedItem::from).collect(),
    }))
}

/// GET /rss.xml
pub async fn rss_xml(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let articles =
        db_services::feed_articles(state.repository.as_ref(), state.config.rss_item_limit).await?;
    let base_url = public_base_url(&state, &headers);
    let channel = Channel {
        title: &state.config.site_title,
        description: &state.config.site_description,
        language: &state.config.site_language,
        base_url: &base_url,
    };
    let body = feeds::render_rss(&channel, &articles, Utc::now());
    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], body).into_response())
}

/// GET /sitemap.xml
pub async fn sitemap_xml(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (categories, articles) = db_services::sitemap_content(state.repository.as_ref()).await?;
    let body = feeds::render_sitemap(&public_base_url(&state, &headers), &categories, &articles);
    Ok((
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        body,
    )
        .into_response())
}

/// GET /robots.txt
pub async fn robots_txt(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let body = feeds::render_robots(&public_base_url(&state, &headers));
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

// =============================================================================
// Automation
// =============================================================================

/// POST /api/articles/create
///
/// Publishing endpoint for the scheduled content task, authenticated with
/// the `X-API-Key` header. The article is attributed to the site owner.
pub async fn create_automated_article(
    State(state): State<AppState>,
    _key: ApiKey,
    Json(request): Json<AutomatedArticleRequest>,
) -> Result<(StatusCode, Json<AutomatedArticleResponse>), AppError> {
    let repo = state.repository.as_ref();
    let owner_open_id = state
        .config
        .owner_open_id
        .as_deref()
        .unwrap_or(FALLBACK_OWNER_OPEN_ID);
    let owner =
        db_services::ensure_owner(repo, owner_open_id, state.config.owner_name.as_deref()).await?;

    let article = db_services::create_automated_article(
        repo,
        request,
        owner.id,
        state.images.as_deref(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(AutomatedArticleResponse {
            success: true,
            article,
        }),
    ))
}
