// tests/page_tests.rs

use blog_store::{
    db::{self, Filter, Registry, Sort, Stored},
    error::AppError,
    models::{
        article::{Article, ArticleField, ArticleRelation},
        auto_reply::{AutoReplyField, AutoReplyRule},
        user::SiteUser,
    },
    page_query,
};

async fn setup() -> Registry {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to open in-memory database");
    Registry::open(pool).await.expect("Failed to define schemas")
}

/// Inserts `n` articles titled "post 0".."post n-1", oldest first.
async fn seed_articles(registry: &Registry, n: usize) -> Vec<Stored<Article>> {
    let mut created = Vec::with_capacity(n);
    for i in 0..n {
        let mut article = Article::new(format!("post {}", i));
        article.tags = vec![if i % 2 == 0 { "even" } else { "odd" }.to_string()];
        created.push(registry.articles().create(article).await.unwrap());
    }
    created
}

#[tokio::test]
async fn first_page_of_twenty_five_newest_first() {
    // Arrange
    let registry = setup().await;
    let created = seed_articles(&registry, 25).await;

    // Act
    let page = page_query(
        1,
        10,
        registry.articles(),
        &[],
        &Filter::All,
        &[Sort::desc(ArticleField::CreatedAt)],
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(page.page_number, 1);
    assert_eq!(page.count, 25);
    assert_eq!(page.page_count, 3);
    assert_eq!(page.results.len(), 10);

    let ids: Vec<i64> = page.results.iter().map(|p| p.record.id).collect();
    let expected: Vec<i64> = created.iter().rev().take(10).map(|a| a.id).collect();
    assert_eq!(ids, expected);

    for pair in page.results.windows(2) {
        assert!(pair[0].record.created_at >= pair[1].record.created_at);
    }
}

#[tokio::test]
async fn result_length_follows_window_formula() {
    let registry = setup().await;
    seed_articles(&registry, 25).await;
    let count: i64 = 25;

    for page_size in [1_i64, 7, 10, 25, 30] {
        for page in 1..=5_i64 {
            let result = page_query(
                page,
                page_size,
                registry.articles(),
                &[],
                &Filter::All,
                &[Sort::asc(ArticleField::Id)],
            )
            .await
            .unwrap();

            let skip = (page - 1) * page_size;
            let expected = page_size.min((count - skip).max(0));
            assert_eq!(
                result.results.len() as i64,
                expected,
                "page={} page_size={}",
                page,
                page_size
            );
            assert_eq!(result.count, count);
        }
    }
}

#[tokio::test]
async fn page_beyond_last_is_empty_not_error() {
    let registry = setup().await;
    seed_articles(&registry, 25).await;

    let page = page_query(4, 10, registry.articles(), &[], &Filter::All, &[])
        .await
        .unwrap();

    assert!(page.results.is_empty());
    assert_eq!(page.count, 25);
    assert_eq!(page.page_count, 3);
    assert_eq!(page.page_number, 4);

    let last = page_query(3, 10, registry.articles(), &[], &Filter::All, &[])
        .await
        .unwrap();
    assert_eq!(last.results.len(), 5);
}

#[tokio::test]
async fn empty_result_has_zero_pages() {
    let registry = setup().await;
    seed_articles(&registry, 3).await;

    let page = page_query(
        1,
        10,
        registry.articles(),
        &[],
        &Filter::eq(ArticleField::Title, "does not exist"),
        &[Sort::desc(ArticleField::CreatedAt)],
    )
    .await
    .unwrap();

    assert_eq!(page.count, 0);
    assert!(page.results.is_empty());
    assert_eq!(page.page_count, 0);
}

#[tokio::test]
async fn page_count_matches_formula_for_boundary_counts() {
    let page_size = 4_i64;

    for count in [0_i64, 1, page_size, page_size + 1, 2 * page_size] {
        let registry = setup().await;
        seed_articles(&registry, count as usize).await;

        let page = page_query(1, page_size, registry.articles(), &[], &Filter::All, &[])
            .await
            .unwrap();

        let expected = match count {
            0 => 0,
            c => (c - 1) / page_size + 1,
        };
        assert_eq!(page.count, count);
        assert_eq!(page.page_count, expected, "count={}", count);
    }
}

#[tokio::test]
async fn filter_applies_to_both_count_and_results() {
    let registry = setup().await;
    seed_articles(&registry, 25).await;

    let page = page_query(
        2,
        5,
        registry.articles(),
        &[],
        &Filter::has(ArticleField::Tags, "even"),
        &[Sort::asc(ArticleField::Id)],
    )
    .await
    .unwrap();

    // posts 0, 2, .. 24 are even: 13 of them
    assert_eq!(page.count, 13);
    assert_eq!(page.page_count, 3);
    assert_eq!(page.results.len(), 5);
    assert!(page.results.iter().all(|p| p.record.tags == vec!["even".to_string()]));
    assert_eq!(page.results[0].record.title, "post 10");
}

#[tokio::test]
async fn invalid_paging_is_rejected() {
    let registry = setup().await;

    for (page, page_size) in [(0, 10), (1, 0), (-3, 10), (1, -1)] {
        let err = page_query(page, page_size, registry.articles(), &[], &Filter::All, &[])
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::BadRequest(_)),
            "page={} page_size={} gave {:?}",
            page,
            page_size,
            err
        );
    }
}

#[tokio::test]
async fn failing_read_fails_the_whole_page() {
    let registry = setup().await;
    registry
        .auto_replies()
        .create(AutoReplyRule::new("k", "v"))
        .await
        .unwrap();

    sqlx::query("DROP TABLE robots")
        .execute(registry.pool())
        .await
        .unwrap();

    let err = page_query(
        1,
        10,
        registry.auto_replies(),
        &[],
        &Filter::eq(AutoReplyField::Key, "k"),
        &[],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::InternalServerError(_)), "got {:?}", err);
}

#[tokio::test]
async fn page_results_are_populated() {
    let registry = setup().await;
    let owner = registry
        .users()
        .create(SiteUser::new("writer", "pw").unwrap())
        .await
        .unwrap();

    for i in 0..3 {
        let mut article = Article::new(format!("owned {}", i));
        article.owner = Some(owner.id);
        registry.articles().create(article).await.unwrap();
    }

    let page = page_query(
        1,
        2,
        registry.articles(),
        &[ArticleRelation::Owner],
        &Filter::eq(ArticleField::Owner, owner.id),
        &[Sort::desc(ArticleField::CreatedAt)],
    )
    .await
    .unwrap();

    assert_eq!(page.count, 3);
    assert_eq!(page.page_count, 2);
    assert_eq!(page.results.len(), 2);
    for result in &page.results {
        let profile = result.expanded.owner_profile.as_ref().unwrap();
        assert_eq!(profile.username, "writer");
    }

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["pageNumber"], 1);
    assert_eq!(json["pageCount"], 2);
    assert_eq!(json["count"], 3);
    assert_eq!(json["results"][0]["owner_profile"]["username"], "writer");
}
