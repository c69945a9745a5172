//! End-to-end pipeline tests against a wiremock stand-in for the service.

use std::sync::Arc;
use std::time::Duration;

use readinglist_core::{
    CacheStore, Credentials, ErrorKind, MemoryCache, ReadingListService, ReqwestTransport,
    SqliteCache, Source, cache_key,
};
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;
use support::wiki::{
    self, ENTRIES_PATH, EXTRACTS_PATH, HOP1_PATH, LOGIN_PATH, batch_titles, requests_to,
    short_extract,
};

fn credentials() -> Credentials {
    Credentials::new("alice", "s3cret")
}

fn service_with(server: &wiremock::MockServer, cache: Arc<dyn CacheStore>) -> ReadingListService {
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    ReadingListService::new(transport, cache, wiki::endpoints(server))
        .with_request_interval(Duration::ZERO)
}

#[tokio::test]
async fn test_pipeline_pages_until_cursor_absent_and_merges_all_entries() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    wiki::mount_login(&server, 1).await;
    wiki::mount_entries(
        &server,
        &[
            wiki::entries(&["Ferris", "Tokio"]),
            wiki::entries(&["Serde"]),
            wiki::entries(&["Axum", "Hyper"]),
        ],
        1,
    )
    .await;
    wiki::mount_extracts(&server, short_extract).await;

    let service = service_with(&server, Arc::new(MemoryCache::new()));
    let list = service.get_reading_list(&credentials()).await.unwrap();

    assert_eq!(requests_to(&server, ENTRIES_PATH).await.len(), 3);
    assert_eq!(
        list.titles().collect::<Vec<_>>(),
        vec!["Axum", "Ferris", "Hyper", "Serde", "Tokio"]
    );
    assert_eq!(list.get("Serde").unwrap().created, "2024-01-01T00:00:00Z");
    assert_eq!(
        list.get("Tokio").unwrap().extract.as_deref(),
        Some("About Tokio.Second line.")
    );
}

#[tokio::test]
async fn test_pipeline_batches_25_titles_as_10_10_5() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let titles: Vec<String> = (1..=25).map(|i| format!("Page {i:02}")).collect();
    let title_refs: Vec<&str> = titles.iter().map(String::as_str).collect();

    wiki::mount_login(&server, 1).await;
    wiki::mount_entries(&server, &[wiki::entries(&title_refs)], 1).await;
    wiki::mount_extracts(&server, short_extract).await;

    let service = service_with(&server, Arc::new(MemoryCache::new()));
    let list = service.get_reading_list(&credentials()).await.unwrap();

    let batches = requests_to(&server, EXTRACTS_PATH).await;
    let sizes: Vec<usize> = batches.iter().map(|r| batch_titles(r).len()).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    for request in &batches {
        let raw = request.url.query_pairs().find(|(k, _)| k == "titles").unwrap().1;
        assert!(!raw.ends_with('|'), "trailing separator in {raw}");
        assert!(request.headers.get("cookie").is_none(), "extract requests carry no cookies");
    }
    assert_eq!(list.len(), 25);
    assert_eq!(list.extract_count(), 25);
}

#[tokio::test]
async fn test_pipeline_ignores_unknown_and_missing_extracts() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    wiki::mount_login(&server, 1).await;
    wiki::mount_entries(&server, &[wiki::entries(&["Kept", "Renamed page"])], 1).await;
    Mock::given(method("GET"))
        .and(path(EXTRACTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "query": {"pages": {
                "1": {"pageid": 1, "title": "Kept", "extract": "Kept text"},
                "2": {"pageid": 2, "title": "Not on the list", "extract": "Stray"},
                "-1": {"ns": 0, "title": "Renamed page", "missing": ""}
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_with(&server, Arc::new(MemoryCache::new()));
    let list = service.get_reading_list(&credentials()).await.unwrap();

    assert_eq!(list.len(), 2);
    assert!(!list.contains("Not on the list"));
    assert_eq!(list.get("Kept").unwrap().extract.as_deref(), Some("Kept text"));
    assert_eq!(list.get("Renamed page").unwrap().extract, None);
}

#[tokio::test]
async fn test_pipeline_truncates_long_extracts_end_to_end() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    fn long_extract(title: &str) -> Option<String> {
        (title == "Long").then(|| format!("{}\n{}", "a".repeat(150), "b".repeat(450)))
    }
    wiki::mount_login(&server, 1).await;
    wiki::mount_entries(&server, &[wiki::entries(&["Long", "Short"])], 1).await;
    wiki::mount_extracts(&server, long_extract).await;

    let service = service_with(&server, Arc::new(MemoryCache::new()));
    let list = service.get_reading_list(&credentials()).await.unwrap();

    let extract = list.get("Long").unwrap().extract.clone().unwrap();
    assert_eq!(extract.chars().count(), 199);
    assert!(!extract.contains('\n'));
    assert_eq!(list.get("Short").unwrap().extract, None);
}

#[tokio::test]
async fn test_second_call_is_served_from_cache_byte_identical() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    wiki::mount_login(&server, 1).await;
    wiki::mount_entries(
        &server,
        &[wiki::entries(&["Ferris"]), wiki::entries(&["Tokio"])],
        1,
    )
    .await;
    wiki::mount_extracts(&server, short_extract).await;

    let service = service_with(&server, Arc::new(MemoryCache::new()));
    let first = service.get_reading_list_json(&credentials()).await.unwrap();
    let second = service.get_reading_list_json(&credentials()).await.unwrap();

    assert_eq!(first.source, Source::Pipeline);
    assert_eq!(second.source, Source::Cache);
    assert_eq!(first.body, second.body);
    assert_eq!(requests_to(&server, EXTRACTS_PATH).await.len(), 1);

    let parsed: Value = serde_json::from_str(&first.body).unwrap();
    assert_eq!(parsed["Ferris"]["created"], "2024-01-01T00:00:00Z");
    assert_eq!(parsed["Ferris"]["extract"], "About Ferris.Second line.");
}

#[tokio::test]
async fn test_sqlite_cache_survives_service_restart() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    wiki::mount_login(&server, 1).await;
    wiki::mount_entries(&server, &[wiki::entries(&["Ferris"])], 1).await;
    wiki::mount_extracts(&server, short_extract).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("cache.db");

    let first = {
        let cache = SqliteCache::new(&db_path).await.unwrap();
        let service = service_with(&server, Arc::new(cache));
        service.get_reading_list_json(&credentials()).await.unwrap()
    };

    let cache = SqliteCache::new(&db_path).await.unwrap();
    let service = service_with(&server, Arc::new(cache));
    let second = service.get_reading_list_json(&credentials()).await.unwrap();

    assert_eq!(second.source, Source::Cache);
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_auth_failure_at_credential_submit_leaves_cache_empty() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(wiki::login_page()))
        .expect(1)
        .mount(&server)
        .await;
    // Wrong password: the form is re-rendered instead of redirecting.
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(wiki::login_page()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let service = service_with(&server, cache.clone());
    let err = service.get_reading_list_json(&credentials()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(cache.is_empty());
    assert!(cache.get(&cache_key("alice")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_auth_failure_at_redirect_hop_is_authentication_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(wiki::login_page()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", HOP1_PATH)
                .append_header("set-cookie", "enwikiSession=s2; path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(HOP1_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("no redirect"))
        .mount(&server)
        .await;

    let service = service_with(&server, Arc::new(MemoryCache::new()));
    let err = service.get_reading_list(&credentials()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert!(err.to_string().contains("redirect"), "{err}");
}

#[tokio::test]
async fn test_login_page_server_error_is_transport_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_with(&server, Arc::new(MemoryCache::new()));
    let err = service.get_reading_list(&credentials()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_malformed_list_page_is_protocol_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    wiki::mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(ENTRIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let service = service_with(&server, cache.clone());
    let err = service.get_reading_list(&credentials()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_unreadable_cached_value_is_replaced_by_fresh_run() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    wiki::mount_login(&server, 1).await;
    wiki::mount_entries(&server, &[wiki::entries(&["Ferris"])], 1).await;
    wiki::mount_extracts(&server, short_extract).await;

    let cache = Arc::new(MemoryCache::new());
    cache
        .put(&cache_key("alice"), "not json{", Duration::from_secs(60))
        .await
        .unwrap();
    let service = service_with(&server, cache.clone());

    let json = service.get_reading_list_json(&credentials()).await.unwrap();

    assert_eq!(json.source, Source::Pipeline);
    let parsed: Value = serde_json::from_str(&json.body).unwrap();
    assert_eq!(parsed["Ferris"]["created"], "2024-01-01T00:00:00Z");
    assert_eq!(
        cache.get(&cache_key("alice")).await.unwrap().as_deref(),
        Some(json.body.as_str())
    );
}
