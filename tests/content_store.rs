//! Content store behaviour over an in-memory backend: read-through caching,
//! TTL expiry, invalidation on every mutation and counter semantics.

mod support;

use std::sync::Arc;
use std::time::Duration;

use plume::application::content::ContentError;
use plume::application::pagination::PageRequest;
use plume::application::repos::{LikeDecrement, PostFilter};
use plume::cache::CacheConfig;
use plume::domain::posts::{NewPost, PostPatch};

use support::{Calls, FailingRead, MemoryRepo, content_store, content_store_with};

#[tokio::test]
async fn second_fetch_is_served_from_cache() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Cached", 1);
    let store = content_store(&repo);

    let first = store.fetch_by_id(id).await.expect("first fetch");
    let second = store.fetch_by_id(id).await.expect("second fetch");

    assert_eq!(first, second);
    assert_eq!(Calls::get(&repo.calls.find_by_id), 1);
}

#[tokio::test]
async fn missing_post_is_not_found_and_not_cached() {
    let repo = Arc::new(MemoryRepo::new());
    let store = content_store(&repo);

    for _ in 0..2 {
        let err = store.fetch_by_id(404).await.expect_err("absent post");
        assert!(matches!(err, ContentError::NotFound { .. }));
    }
    assert_eq!(Calls::get(&repo.calls.find_by_id), 2);
}

#[tokio::test(start_paused = true)]
async fn cached_post_expires_after_its_ttl() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Before", 1);
    let store = content_store(&repo);

    store.fetch_by_id(id).await.expect("populate");
    repo.rename_behind_cache(id, "After");

    tokio::time::advance(Duration::from_secs(299)).await;
    let still_cached = store.fetch_by_id(id).await.expect("cached read");
    assert_eq!(still_cached.title, "Before");

    tokio::time::advance(Duration::from_secs(2)).await;
    let refreshed = store.fetch_by_id(id).await.expect("refreshed read");
    assert_eq!(refreshed.title, "After");
    assert_eq!(Calls::get(&repo.calls.find_by_id), 2);
}

#[tokio::test(start_paused = true)]
async fn page_entries_use_the_shorter_ttl() {
    let repo = Arc::new(MemoryRepo::new());
    repo.seed("One", 1);
    let store = content_store(&repo);
    let request = PageRequest::new(Some(1), Some(10));

    store.fetch_page(request).await.expect("populate");
    tokio::time::advance(Duration::from_secs(30)).await;
    store.fetch_page(request).await.expect("cached");
    assert_eq!(Calls::get(&repo.calls.list_posts), 1);

    tokio::time::advance(Duration::from_secs(31)).await;
    store.fetch_page(request).await.expect("expired");
    assert_eq!(Calls::get(&repo.calls.list_posts), 2);
}

#[tokio::test]
async fn zero_ttl_entries_never_expire() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Pinned", 1);
    let store = content_store_with(
        &repo,
        CacheConfig {
            post_ttl_seconds: 0,
            ..CacheConfig::default()
        },
    );

    store.fetch_by_id(id).await.expect("populate");
    store.fetch_by_id(id).await.expect("cached");
    assert_eq!(Calls::get(&repo.calls.find_by_id), 1);
}

#[tokio::test]
async fn disabled_cache_always_reaches_backend() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Uncached", 1);
    let store = content_store_with(
        &repo,
        CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        },
    );

    store.fetch_by_id(id).await.expect("first");
    store.fetch_by_id(id).await.expect("second");
    assert_eq!(Calls::get(&repo.calls.find_by_id), 2);
}

#[tokio::test]
async fn update_invalidates_post_and_lists() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Original", 7);
    let store = content_store(&repo);
    let request = PageRequest::new(None, None);

    store.fetch_by_id(id).await.expect("populate post");
    store.fetch_page(request).await.expect("populate page");
    store.fetch_all().await.expect("populate all");

    let patch = PostPatch::new(Some("Edited".into()), None).expect("patch");
    let updated = store.update_fields(id, 7, patch).await.expect("update");
    assert_eq!(updated.title, "Edited");

    let post = store.fetch_by_id(id).await.expect("post after update");
    let page = store.fetch_page(request).await.expect("page after update");
    let all = store.fetch_all().await.expect("all after update");

    assert_eq!(post.title, "Edited");
    assert_eq!(page.items[0].title, "Edited");
    assert_eq!(all[0].title, "Edited");
    assert_eq!(Calls::get(&repo.calls.find_by_id), 2);
    assert_eq!(Calls::get(&repo.calls.list_posts), 2);
    assert_eq!(Calls::get(&repo.calls.list_all), 2);
}

#[tokio::test]
async fn update_by_non_owner_is_not_found_and_keeps_row() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Mine", 1);
    let store = content_store(&repo);

    let patch = PostPatch::new(Some("Stolen".into()), None).expect("patch");
    let err = store
        .update_fields(id, 2, patch)
        .await
        .expect_err("foreign owner");

    assert!(matches!(err, ContentError::NotFound { .. }));
    assert_eq!(repo.snapshot(id).expect("row").title, "Mine");
}

#[tokio::test]
async fn delete_removes_cached_entries() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Doomed", 3);
    let store = content_store(&repo);

    store.fetch_by_id(id).await.expect("populate");
    store.delete_by_id(id, 3).await.expect("delete");

    let err = store.fetch_by_id(id).await.expect_err("deleted");
    assert!(matches!(err, ContentError::NotFound { .. }));
}

#[tokio::test]
async fn create_with_tags_returns_every_tag_and_invalidates_lists() {
    let repo = Arc::new(MemoryRepo::new());
    repo.seed("Existing", 1);
    let store = content_store(&repo);
    let request = PageRequest::new(None, None);

    let before = store.fetch_page(request).await.expect("populate page");
    assert_eq!(before.total, 1);

    let post = NewPost::new("Tagged", "Body", 1, ["go", " x ", "go"]).expect("valid post");
    let created = store.create(post).await.expect("create");

    let names: Vec<&str> = created.tags.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, ["go", "x"]);

    let after = store.fetch_page(request).await.expect("page after create");
    assert_eq!(after.total, 2);
    assert_eq!(after.items[0].id, created.id);
}

#[tokio::test]
async fn linking_a_tag_is_visible_on_next_read() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Plain", 1);
    let store = content_store(&repo);

    let before = store.fetch_by_id(id).await.expect("populate");
    assert!(before.tags.is_empty());

    let tag = store.find_or_create_tag("rust").await.expect("tag");
    store.link_tag(id, tag.id).await.expect("link");
    store.link_tag(id, tag.id).await.expect("relink is a no-op");

    let after = store.fetch_by_id(id).await.expect("reload");
    assert!(after.has_tag("rust"));
    assert_eq!(after.tags.len(), 1);
}

#[tokio::test]
async fn views_and_likes_invalidate_cached_post() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Popular", 1);
    let store = content_store(&repo);

    store.fetch_by_id(id).await.expect("populate");
    store.increment_view(id).await.expect("view");
    store.add_like(id, 9).await.expect("like");

    let post = store.fetch_by_id(id).await.expect("reload");
    assert_eq!(post.view_count, 1);
    assert_eq!(post.like_count, 1);
}

#[tokio::test]
async fn removing_a_like_never_goes_below_zero() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Unloved", 1);
    let store = content_store(&repo);

    store.fetch_by_id(id).await.expect("populate");
    let outcome = store.remove_like(id, 5).await.expect("unlike at zero");
    assert_eq!(outcome, LikeDecrement::AlreadyZero);

    store.fetch_by_id(id).await.expect("still cached");
    assert_eq!(Calls::get(&repo.calls.find_by_id), 1);

    store.add_like(id, 5).await.expect("like");
    assert_eq!(
        store.remove_like(id, 5).await.expect("unlike"),
        LikeDecrement::Applied
    );
    let popularity = store.get_popularity(id).await.expect("popularity");
    assert_eq!(popularity.like_count, 0);
}

#[tokio::test]
async fn counters_on_missing_post_are_not_found() {
    let repo = Arc::new(MemoryRepo::new());
    let store = content_store(&repo);

    assert!(matches!(
        store.increment_view(77).await,
        Err(ContentError::NotFound { .. })
    ));
    assert!(matches!(
        store.get_popularity(77).await,
        Err(ContentError::NotFound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_likes_are_all_counted() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Contended", 1);
    let store = Arc::new(content_store(&repo));

    let tasks: Vec<_> = (0..64)
        .map(|user| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_like(id, user + 1).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("join").expect("like");
    }

    let popularity = store.get_popularity(id).await.expect("popularity");
    assert_eq!(popularity.like_count, 64);
}

#[tokio::test]
async fn page_matches_sequential_count_and_slice() {
    let repo = Arc::new(MemoryRepo::new());
    for n in 0..25 {
        repo.seed(&format!("Post {n}"), 1);
    }
    let store = content_store(&repo);

    let page = store
        .fetch_page(PageRequest::new(Some(2), Some(10)))
        .await
        .expect("page");

    assert_eq!(page.total, 25);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 10);
    assert_eq!(page.total_pages(), 3);
    let titles: Vec<&str> = page.items.iter().map(|post| post.title.as_str()).collect();
    let expected: Vec<String> = (5..15).rev().map(|n| format!("Post {n}")).collect();
    assert_eq!(titles, expected);
}

#[tokio::test(start_paused = true)]
async fn page_count_and_slice_run_concurrently() {
    let delay = Duration::from_millis(200);
    let repo = Arc::new(MemoryRepo::with_read_delay(delay));
    repo.seed("Slow", 1);
    let store = content_store(&repo);

    let started = tokio::time::Instant::now();
    store
        .fetch_page(PageRequest::new(None, None))
        .await
        .expect("page");

    assert!(started.elapsed() < delay * 2);
    assert_eq!(Calls::get(&repo.calls.count_posts), 1);
    assert_eq!(Calls::get(&repo.calls.list_posts), 1);
}

#[tokio::test]
async fn blank_search_does_not_touch_backend() {
    let repo = Arc::new(MemoryRepo::new());
    repo.seed("Searchable", 1);
    let store = content_store(&repo);

    let results = store
        .search("   ", PageRequest::new(Some(2), Some(5)))
        .await
        .expect("blank search");

    assert!(results.items.is_empty());
    assert_eq!(results.total, 0);
    assert_eq!(results.page, 2);
    assert_eq!(Calls::get(&repo.calls.search), 0);
    assert_eq!(Calls::get(&repo.calls.count_search), 0);
}

#[tokio::test]
async fn search_is_never_cached() {
    let repo = Arc::new(MemoryRepo::new());
    repo.seed("Rust tips", 1);
    repo.seed("Go tips", 1);
    let store = content_store(&repo);

    for _ in 0..2 {
        let results = store
            .search("rust", PageRequest::new(None, None))
            .await
            .expect("search");
        assert_eq!(results.items.len(), 1);
    }
    assert_eq!(Calls::get(&repo.calls.search), 2);
    assert!(store.cache().is_empty());
}

#[tokio::test]
async fn search_reports_total_matches_beyond_the_page() {
    let repo = Arc::new(MemoryRepo::new());
    for n in 0..5 {
        repo.seed(&format!("Rust part {n}"), 1);
    }
    repo.seed("Go basics", 1);
    let store = content_store(&repo);

    let page = store
        .search("RUST", PageRequest::new(Some(2), Some(2)))
        .await
        .expect("search");

    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages(), 3);
    let titles: Vec<&str> = page.items.iter().map(|post| post.title.as_str()).collect();
    assert_eq!(titles, ["Rust part 2", "Rust part 1"]);
    assert_eq!(Calls::get(&repo.calls.count_search), 1);
}

#[tokio::test]
async fn failed_half_of_a_page_fails_the_fetch_and_caches_nothing() {
    let repo = Arc::new(MemoryRepo::new());
    repo.seed("Fragile", 1);
    let store = content_store(&repo);
    let request = PageRequest::new(None, None);

    for read in [FailingRead::Count, FailingRead::Slice] {
        repo.fail_reads(Some(read));
        let err = store.fetch_page(request).await.expect_err("failed read");
        assert!(
            matches!(err, ContentError::Backend { .. }),
            "{read:?}: {err:?}"
        );
        assert!(store.cache().is_empty(), "{read:?}");
    }

    repo.fail_reads(None);
    let page = store.fetch_page(request).await.expect("recovered");
    assert_eq!(page.total, 1);
    assert_eq!(store.cache().len(), 1);
}

#[tokio::test]
async fn failed_search_count_fails_the_search() {
    let repo = Arc::new(MemoryRepo::new());
    repo.seed("Rust", 1);
    repo.fail_reads(Some(FailingRead::Count));
    let store = content_store(&repo);

    let err = store
        .search("rust", PageRequest::new(None, None))
        .await
        .expect_err("count failure");
    assert!(matches!(err, ContentError::Backend { .. }));
}

#[tokio::test(start_paused = true)]
async fn dropped_page_fetch_caches_nothing() {
    let repo = Arc::new(MemoryRepo::with_read_delay(Duration::from_millis(100)));
    repo.seed("Slow", 1);
    let store = content_store(&repo);

    let outcome = tokio::time::timeout(
        Duration::from_millis(10),
        store.fetch_page(PageRequest::new(None, None)),
    )
    .await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(store.cache().is_empty());
    assert_eq!(Calls::get(&repo.calls.count_posts), 1);
    assert_eq!(Calls::get(&repo.calls.list_posts), 1);
}

#[tokio::test(start_paused = true)]
async fn read_in_flight_during_update_does_not_repopulate() {
    let repo = Arc::new(MemoryRepo::with_read_delay(Duration::from_millis(100)));
    let id = repo.seed("Old", 1);
    let store = content_store(&repo);
    let request = PageRequest::new(None, None);

    let (page, updated) = tokio::join!(store.fetch_page(request), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let patch = PostPatch::new(Some("New".into()), None).expect("patch");
        store.update_fields(id, 1, patch).await
    });
    page.expect("in-flight page");
    updated.expect("update");
    assert!(store.cache().is_empty());

    let page = store.fetch_page(request).await.expect("fresh page");
    assert_eq!(page.items[0].title, "New");
    assert_eq!(Calls::get(&repo.calls.list_posts), 2);
}

#[tokio::test]
async fn filter_scopes_by_owner_and_title() {
    let repo = Arc::new(MemoryRepo::new());
    repo.seed("Alpha notes", 1);
    repo.seed("Beta notes", 1);
    repo.seed("Alpha draft", 2);
    let store = content_store(&repo);

    let mine = store
        .fetch_by_filter(PostFilter {
            owner_id: Some(1),
            title_contains: Some(" alpha ".into()),
            ..PostFilter::default()
        })
        .await
        .expect("filter");

    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].title, "Alpha notes");
}

#[tokio::test]
async fn purge_drops_every_entry() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Purged", 1);
    let store = content_store(&repo);

    store.fetch_by_id(id).await.expect("post");
    store.fetch_all().await.expect("all");
    assert_eq!(store.purge_cache(), 2);

    store.fetch_by_id(id).await.expect("post again");
    assert_eq!(Calls::get(&repo.calls.find_by_id), 2);
}

#[tokio::test]
async fn owner_lookup_prefers_cached_post() {
    let repo = Arc::new(MemoryRepo::new());
    let id = repo.seed("Owned", 4);
    let store = content_store(&repo);

    store.fetch_by_id(id).await.expect("populate");
    assert_eq!(store.find_owner(id).await.expect("owner"), Some(4));
    assert_eq!(Calls::get(&repo.calls.find_owner), 0);

    assert_eq!(store.find_owner(999).await.expect("missing"), None);
    assert_eq!(Calls::get(&repo.calls.find_owner), 1);
}
