use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::repositories::LocalRepository;
use super::repository::*;
use super::services;
use crate::api::*;
use crate::images::CoverImageGenerator;

async fn seeded() -> (LocalRepository, Category, User) {
    let repo = LocalRepository::new();
    let category = repo
        .create_category(NewCategory {
            name: "Mécanique".to_string(),
            slug: "mecanique".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let author = repo
        .upsert_user(UpsertUser {
            open_id: "owner".to_string(),
            name: Some("Équipe FleetCrew".to_string()),
            role: Some(UserRole::Admin),
            ..Default::default()
        })
        .await
        .unwrap();
    (repo, category, author)
}

fn request(title: &str, slug: &str, category_id: CategoryId) -> CreateArticleRequest {
    CreateArticleRequest {
        title: title.to_string(),
        slug: slug.to_string(),
        excerpt: None,
        content: "## Intro\nUn texte de test suffisamment long.".to_string(),
        cover_image: None,
        category_id,
        status: ArticleStatus::Draft,
        featured: false,
        read_time: None,
        scheduled_at: None,
        tag_ids: None,
    }
}

fn is_validation<T: std::fmt::Debug>(result: &RepositoryResult<T>) -> bool {
    matches!(result, Err(RepositoryError::ValidationError { .. }))
}

struct FixedCover {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl CoverImageGenerator for FixedCover {
    async fn generate_cover(&self, _title: &str, _excerpt: Option<&str>) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("generator offline");
        }
        Ok("https://img.example/cover.png".to_string())
    }
}

#[tokio::test]
async fn test_create_published_sets_published_at_and_default_read_time() {
    let (repo, category, author) = seeded().await;
    let mut req = request("Freins", "freins", category.id);
    req.status = ArticleStatus::Published;

    let article = services::create_article(&repo, req, author.id).await.unwrap();
    assert!(article.published_at.is_some());
    assert_eq!(article.read_time, services::DEFAULT_READ_TIME);
}

#[tokio::test]
async fn test_create_draft_has_no_published_at() {
    let (repo, category, author) = seeded().await;
    let article = services::create_article(&repo, request("Pneus", "pneus", category.id), author.id)
        .await
        .unwrap();
    assert!(article.published_at.is_none());
}

#[tokio::test]
async fn test_create_rejects_unknown_category() {
    let (repo, _, author) = seeded().await;
    let result =
        services::create_article(&repo, request("Pneus", "pneus", CategoryId(999)), author.id).await;
    assert!(is_validation(&result));
}

#[tokio::test]
async fn test_first_publish_stamps_once() {
    let (repo, category, author) = seeded().await;
    let article = services::create_article(&repo, request("Huile", "huile", category.id), author.id)
        .await
        .unwrap();

    let publish = UpdateArticleRequest {
        status: Some(ArticleStatus::Published),
        ..Default::default()
    };
    let first = services::update_article(&repo, article.id, publish.clone())
        .await
        .unwrap();
    let stamped = first.published_at.expect("published_at set on first publish");

    let second = services::update_article(&repo, article.id, publish).await.unwrap();
    assert_eq!(second.published_at, Some(stamped));
}

#[tokio::test]
async fn test_update_replaces_tags_only_when_given() {
    let (repo, category, author) = seeded().await;
    let saaq = services::get_or_create_tag(&repo, "SAAQ").await.unwrap();
    let ia = services::get_or_create_tag(&repo, "IA").await.unwrap();

    let mut req = request("Conformité", "conformite", category.id);
    req.tag_ids = Some(vec![saaq.id]);
    let article = services::create_article(&repo, req, author.id).await.unwrap();

    services::update_article(
        &repo,
        article.id,
        UpdateArticleRequest {
            title: Some("Conformité 2025".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(repo.get_article_tags(article.id).await.unwrap(), vec![saaq.clone()]);

    services::update_article(
        &repo,
        article.id,
        UpdateArticleRequest {
            tag_ids: Some(vec![ia.id]),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(repo.get_article_tags(article.id).await.unwrap(), vec![ia]);
}

#[tokio::test]
async fn test_update_unknown_article_is_not_found() {
    let repo = LocalRepository::new();
    let result =
        services::update_article(&repo, ArticleId(77), UpdateArticleRequest::default()).await;
    assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
}

#[tokio::test]
async fn test_get_or_create_tag_reuses_slug() {
    let repo = LocalRepository::new();
    let first = services::get_or_create_tag(&repo, "Maintenance Préventive")
        .await
        .unwrap();
    let again = services::get_or_create_tag(&repo, "maintenance preventive")
        .await
        .unwrap();
    assert_eq!(first.slug, "maintenance-preventive");
    assert_eq!(first.id, again.id);
    assert_eq!(repo.list_tags().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_or_create_tag_finds_name_under_other_slug() {
    let repo = LocalRepository::new();
    let existing = repo
        .create_tag(NewTag {
            name: "IA".to_string(),
            slug: "intelligence".to_string(),
        })
        .await
        .unwrap();

    let tag = services::get_or_create_tag(&repo, "IA").await.unwrap();
    assert_eq!(tag.id, existing.id);
    assert_eq!(tag.slug, "intelligence");
    assert_eq!(repo.list_tags().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_articles_validates_bounds() {
    let repo = LocalRepository::new();
    let too_big = ArticleQuery {
        limit: Some(51),
        ..Default::default()
    };
    assert!(is_validation(&services::list_articles(&repo, too_big).await));

    let negative = ArticleQuery {
        offset: Some(-1),
        ..Default::default()
    };
    assert!(is_validation(&services::list_articles(&repo, negative).await));

    assert!(is_validation(&services::featured_articles(&repo, Some(11)).await));
    assert!(services::featured_articles(&repo, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_articles_defaults_to_ten() {
    let (repo, category, author) = seeded().await;
    for i in 0..12 {
        let mut req = request(&format!("Article {}", i), &format!("article-{}", i), category.id);
        req.status = ArticleStatus::Published;
        services::create_article(&repo, req, author.id).await.unwrap();
    }
    let page = services::list_articles(&repo, ArticleQuery::default())
        .await
        .unwrap();
    assert_eq!(page.len(), 10);
}

#[tokio::test]
async fn test_reads_degrade_when_unavailable() {
    let repo = LocalRepository::new();
    repo.set_healthy(false);

    assert!(services::list_articles(&repo, ArticleQuery::default())
        .await
        .unwrap()
        .is_empty());
    assert!(services::list_categories(&repo).await.unwrap().is_empty());
    assert!(services::get_article_detail(&repo, "absent")
        .await
        .unwrap()
        .is_none());
    assert!(!services::has_liked(&repo, ArticleId(1), "v1").await.unwrap());

    let write = services::subscribe(&repo, "a@b.ca", None).await;
    assert!(matches!(write, Err(ref e) if e.is_unavailable()));
}

#[tokio::test]
async fn test_article_detail_hides_drafts_and_carries_context() {
    let (repo, category, author) = seeded().await;
    let draft = services::create_article(&repo, request("Brouillon", "brouillon", category.id), author.id)
        .await
        .unwrap();
    assert!(services::get_article_detail(&repo, "brouillon")
        .await
        .unwrap()
        .is_none());

    services::update_article(
        &repo,
        draft.id,
        UpdateArticleRequest {
            status: Some(ArticleStatus::Published),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let detail = services::get_article_detail(&repo, "brouillon")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.category.as_ref().map(|c| c.id), Some(category.id));
    assert_eq!(detail.author.as_ref().map(|a| a.id), Some(author.id));
    assert_eq!(detail.headings.len(), 1);
    assert_eq!(detail.headings[0].text, "Intro");
}

#[tokio::test]
async fn test_subscribe_normalizes_and_validates_email() {
    let repo = LocalRepository::new();
    let sub = services::subscribe(&repo, "  Gestion@Flotte.CA ", Some("Luc"))
        .await
        .unwrap();
    assert_eq!(sub.email, "gestion@flotte.ca");

    assert!(is_validation(&services::subscribe(&repo, "not-an-email", None).await));

    assert!(services::unsubscribe(&repo, "GESTION@flotte.ca").await.unwrap());
    assert_eq!(services::subscriber_count(&repo).await.unwrap(), 0);
    assert_eq!(services::list_subscribers(&repo, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_contact_requires_ten_character_message() {
    let repo = LocalRepository::new();
    let message = NewContactMessage {
        name: "Marie".to_string(),
        email: "marie@transport.ca".to_string(),
        subject: "Devis".to_string(),
        message: "trop cour".to_string(),
        kind: ContactKind::Demande,
    };
    assert!(is_validation(&services::submit_contact(&repo, message.clone()).await));

    let stored = services::submit_contact(
        &repo,
        NewContactMessage {
            message: "Bonjour, nous avons 40 camions.".to_string(),
            ..message.clone()
        },
    )
    .await
    .unwrap();
    assert_eq!(stored.status, ContactStatus::Nouveau);
    assert_eq!(services::new_contact_count(&repo).await.unwrap(), 1);

    services::update_contact_status(&repo, stored.id, ContactStatus::Lu)
        .await
        .unwrap();
    assert_eq!(services::new_contact_count(&repo).await.unwrap(), 0);

    let boundary = NewContactMessage {
        message: "dix lettre".to_string(),
        ..message
    };
    assert_eq!(boundary.message.chars().count(), 10);
    services::submit_contact(&repo, boundary).await.unwrap();
    assert_eq!(services::new_contact_count(&repo).await.unwrap(), 1);
}

#[tokio::test]
async fn test_record_view_hashes_ip_and_truncates_headers() {
    let (repo, category, author) = seeded().await;
    let article = services::create_article(&repo, request("Vue", "vue", category.id), author.id)
        .await
        .unwrap();

    let view = services::record_view(
        &repo,
        RecordViewRequest {
            article_id: article.id,
            visitor_id: "visitor-1".to_string(),
            user_agent: Some("x".repeat(800)),
            referrer: Some(String::new()),
        },
        None,
        Some("203.0.113.9"),
    )
    .await
    .unwrap();

    let hash = view.ip_hash.expect("ip hashed");
    assert_eq!(hash.len(), 64);
    assert_ne!(hash, "203.0.113.9");
    assert_eq!(view.user_agent.map(|u| u.chars().count()), Some(services::MAX_HEADER_CHARS));
    assert!(view.referrer.is_none());
}

#[tokio::test]
async fn test_record_view_rejects_empty_visitor() {
    let repo = LocalRepository::new();
    let result = services::record_view(
        &repo,
        RecordViewRequest {
            article_id: ArticleId(1),
            visitor_id: "   ".to_string(),
            ..Default::default()
        },
        None,
        None,
    )
    .await;
    assert!(is_validation(&result));
}

#[tokio::test]
async fn test_view_progress_is_clamped() {
    let (repo, category, author) = seeded().await;
    let article = services::create_article(&repo, request("Vue", "vue", category.id), author.id)
        .await
        .unwrap();
    let view = services::record_view(
        &repo,
        RecordViewRequest {
            article_id: article.id,
            visitor_id: "v".to_string(),
            ..Default::default()
        },
        None,
        None,
    )
    .await
    .unwrap();

    let updated = services::update_view_progress(
        &repo,
        view.id,
        ViewProgress {
            read_time: Some(-20),
            scroll_depth: Some(250),
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.read_time, 0);
    assert_eq!(updated.scroll_depth, 100);
}

#[tokio::test]
async fn test_stats_dispatches_on_article_id() {
    let (repo, category, author) = seeded().await;
    let mut req = request("Stat", "stat", category.id);
    req.status = ArticleStatus::Published;
    let article = services::create_article(&repo, req, author.id).await.unwrap();
    services::toggle_like(&repo, article.id, "v1", None).await.unwrap();

    match services::stats(&repo, Some(article.id)).await.unwrap() {
        Stats::Article(stats) => assert_eq!(stats.views, 0),
        other => panic!("expected article stats, got {:?}", other),
    }
    match services::stats(&repo, None).await.unwrap() {
        Stats::Site(stats) => {
            assert_eq!(stats.total_likes, 1);
            assert_eq!(stats.published_articles, 1);
        }
        other => panic!("expected site stats, got {:?}", other),
    }
}

#[tokio::test]
async fn test_popular_limit_is_clamped() {
    let (repo, category, author) = seeded().await;
    for i in 0..3 {
        let mut req = request(&format!("P{}", i), &format!("p-{}", i), category.id);
        req.status = ArticleStatus::Published;
        services::create_article(&repo, req, author.id).await.unwrap();
    }
    assert_eq!(services::popular_articles(&repo, Some(0)).await.unwrap().len(), 1);
    assert_eq!(services::popular_articles(&repo, None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_sign_in_promotes_owner_only() {
    let repo = LocalRepository::new();
    let owner = services::sign_in(&repo, "owner-1", None, None, None, Some("owner-1"))
        .await
        .unwrap();
    assert!(owner.is_admin());

    let reader = services::sign_in(&repo, "reader", Some("Ana".into()), None, None, Some("owner-1"))
        .await
        .unwrap();
    assert!(!reader.is_admin());

    let again = services::ensure_owner(&repo, "owner-1", None).await.unwrap();
    assert_eq!(again.id, owner.id);
}

#[tokio::test]
async fn test_automated_article_creates_tags_and_cover() {
    let (repo, category, author) = seeded().await;
    let generator = FixedCover {
        calls: AtomicUsize::new(0),
        fail: false,
    };
    let req = AutomatedArticleRequest {
        title: "Entretien des freins à air".to_string(),
        content: "mot ".repeat(450),
        category_slug: category.slug.clone(),
        tag_slugs: Some(vec!["freins".to_string(), "saaq".to_string()]),
        generate_cover_image: true,
        ..Default::default()
    };

    let article = services::create_automated_article(&repo, req, author.id, Some(&generator))
        .await
        .unwrap();
    assert_eq!(article.slug, "entretien-des-freins-a-air");
    assert_eq!(article.status, ArticleStatus::Published);
    assert_eq!(article.read_time, 3);
    assert_eq!(article.cover_image.as_deref(), Some("https://img.example/cover.png"));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(repo.get_article_tags(article.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_automated_article_survives_cover_failure() {
    let (repo, category, author) = seeded().await;
    let generator = FixedCover {
        calls: AtomicUsize::new(0),
        fail: true,
    };
    let req = AutomatedArticleRequest {
        title: "Télématique".to_string(),
        content: "Contenu".to_string(),
        category_slug: category.slug.clone(),
        generate_cover_image: true,
        ..Default::default()
    };
    let article = services::create_automated_article(&repo, req, author.id, Some(&generator))
        .await
        .unwrap();
    assert!(article.cover_image.is_none());
}

#[tokio::test]
async fn test_automated_article_unknown_category() {
    let (repo, _, author) = seeded().await;
    let req = AutomatedArticleRequest {
        title: "Sans catégorie".to_string(),
        content: "Contenu".to_string(),
        category_slug: "inconnue".to_string(),
        ..Default::default()
    };
    let result = services::create_automated_article(&repo, req, author.id, None).await;
    assert!(is_validation(&result));
}
