//! Properties of the engagement counters against the in-memory repository.

use std::collections::BTreeMap;

use chrono::Utc;
use proptest::prelude::*;

use fleetcrew_blog::api::*;
use fleetcrew_blog::db::repositories::LocalRepository;
use fleetcrew_blog::db::repository::{AnalyticsRepository, ArticleRepository};

fn published(slug: &str) -> NewArticle {
    NewArticle {
        title: slug.to_string(),
        slug: slug.to_string(),
        excerpt: None,
        content: "contenu".to_string(),
        cover_image: None,
        category_id: CategoryId(1),
        author_id: UserId(1),
        status: ArticleStatus::Published,
        featured: false,
        read_time: 3,
        published_at: Some(Utc::now()),
        scheduled_at: None,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn like_counter_matches_rows(toggles in prop::collection::vec(0usize..4, 0..40)) {
        let rt = runtime();
        let (counter, rows, expected) = rt.block_on(async {
            let repo = LocalRepository::new();
            let article = repo.create_article(published("a")).await.unwrap();
            let mut liked: BTreeMap<usize, bool> = BTreeMap::new();
            for visitor in &toggles {
                let result = repo
                    .toggle_like(article.id, &format!("v{}", visitor), None)
                    .await
                    .unwrap();
                let state = liked.entry(*visitor).or_insert(false);
                *state = !*state;
                assert_eq!(result.liked, *state);
            }
            let stored = repo.get_article(article.id).await.unwrap().unwrap();
            let expected = liked.values().filter(|l| **l).count();
            (stored.like_count, repo.like_row_count(article.id), expected)
        });
        prop_assert_eq!(counter as usize, rows);
        prop_assert_eq!(rows, expected);
    }

    #[test]
    fn view_counter_matches_recorded_views(visitors in prop::collection::vec("[a-c]{1,2}", 0..30)) {
        let rt = runtime();
        let (counter, rows, stats) = rt.block_on(async {
            let repo = LocalRepository::new();
            let article = repo.create_article(published("b")).await.unwrap();
            for visitor in &visitors {
                repo.record_view(NewArticleView {
                    article_id: article.id,
                    visitor_id: visitor.clone(),
                    ..Default::default()
                })
                .await
                .unwrap();
            }
            let stored = repo.get_article(article.id).await.unwrap().unwrap();
            let stats = repo.article_stats(article.id).await.unwrap();
            (stored.view_count, repo.view_row_count(article.id), stats)
        });
        let distinct: std::collections::BTreeSet<_> = visitors.iter().collect();
        prop_assert_eq!(counter as usize, visitors.len());
        prop_assert_eq!(rows, visitors.len());
        prop_assert_eq!(stats.views as usize, visitors.len());
        prop_assert_eq!(stats.unique_visitors as usize, distinct.len());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_keep_counter_consistent() {
    let repo = LocalRepository::new();
    let article = repo.create_article(published("c")).await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.toggle_like(article.id, "same-visitor", None).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = repo.get_article(article.id).await.unwrap().unwrap();
    assert_eq!(repo.like_row_count(article.id), 0);
    assert_eq!(stored.like_count, 0);
    assert!(!repo.has_liked(article.id, "same-visitor").await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_likes_all_count() {
    let repo = LocalRepository::new();
    let article = repo.create_article(published("d")).await.unwrap();

    let handles: Vec<_> = (0..25)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.toggle_like(article.id, &format!("v{}", i), None).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().liked);
    }

    let stored = repo.get_article(article.id).await.unwrap().unwrap();
    assert_eq!(stored.like_count, 25);
    assert_eq!(repo.like_row_count(article.id), 25);
}
