//! End-to-end sync against a local stand-in for the Tito API.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use sync_core::{Partition, TicketId};
use ticketsync_worker::config::Config;
use ticketsync_worker::engine::{EngineSettings, SyncEngine};
use ticketsync_worker::error::FetchError;
use ticketsync_worker::remote::{RegistrationSource, TitoClient};
use ticketsync_worker::storage::{SqliteStorage, TicketStore};

/// How the fake serves a given page.
#[derive(Clone)]
enum PageBehaviour {
    Ok(Vec<String>),
    Status(StatusCode),
    Garbage,
}

#[derive(Clone, Default)]
struct FakeTito {
    pages: Arc<Mutex<HashMap<u32, PageBehaviour>>>,
    total_pages: Arc<Mutex<u32>>,
    seen_auth: Arc<Mutex<Vec<String>>>,
    seen_paths: Arc<Mutex<Vec<String>>>,
}

impl FakeTito {
    fn new(pages: Vec<PageBehaviour>) -> Self {
        let fake = Self::default();
        *fake.total_pages.lock().unwrap() = pages.len() as u32;
        let mut map = fake.pages.lock().unwrap();
        for (i, page) in pages.into_iter().enumerate() {
            map.insert(i as u32 + 1, page);
        }
        drop(map);
        fake
    }

    fn set_page(&self, page: u32, behaviour: PageBehaviour) {
        self.pages.lock().unwrap().insert(page, behaviour);
    }
}

#[derive(Deserialize)]
struct PageQuery {
    page: u32,
}

async fn registrations(
    State(fake): State<FakeTito>,
    Path((account, event)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Response {
    fake.seen_paths
        .lock()
        .unwrap()
        .push(format!("{}/{}?page={}", account, event, query.page));
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        fake.seen_auth
            .lock()
            .unwrap()
            .push(auth.to_str().unwrap_or_default().to_string());
    }

    let total = *fake.total_pages.lock().unwrap();
    let behaviour = fake.pages.lock().unwrap().get(&query.page).cloned();
    match behaviour {
        Some(PageBehaviour::Ok(ids)) => {
            let next = if query.page < total {
                json!(query.page + 1)
            } else {
                json!(null)
            };
            let body = json!({
                "meta": { "current_page": query.page, "next_page": next, "total_pages": total },
                "tickets": ids.iter().map(|id| json!({ "id": id, "state": "complete" })).collect::<Vec<_>>(),
            });
            (
                [(header::CONTENT_TYPE, "application/vnd.api+json")],
                body.to_string(),
            )
                .into_response()
        }
        Some(PageBehaviour::Status(status)) => (status, "upstream unhappy").into_response(),
        Some(PageBehaviour::Garbage) => (StatusCode::OK, "{ not json").into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve(fake: FakeTito) -> String {
    let app = Router::new()
        .route("/v3/:account/:event/registrations", get(registrations))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v3", addr)
}

fn client_for(base_url: &str) -> TitoClient {
    let mut config = Config::default();
    config.tito.base_url = base_url.to_string();
    config.tito.account_id = "dddperth".into();
    config.tito.event_id = "2024".into();
    config.tito.api_key = Some("s3cret".into());
    config.tito.request_timeout_secs = 5;
    TitoClient::new(&config.tito).unwrap()
}

fn ok_page(ids: &[&str]) -> PageBehaviour {
    PageBehaviour::Ok(ids.iter().map(|s| s.to_string()).collect())
}

fn partition() -> Partition {
    Partition::new("2024").unwrap()
}

fn id_set(raw: &[&str]) -> std::collections::HashSet<TicketId> {
    raw.iter().map(|s| TicketId::new(*s).unwrap()).collect()
}

fn engine_with(
    base_url: &str,
    store: Arc<SqliteStorage>,
    batch_limit: usize,
) -> SyncEngine {
    let mut settings = EngineSettings::new(partition());
    settings.batch_limit = batch_limit;
    SyncEngine::new(Arc::new(client_for(base_url)), store, settings)
}

#[tokio::test]
async fn client_sends_token_header_and_page_query() {
    let fake = FakeTito::new(vec![ok_page(&["a", "b"])]);
    let base = serve(fake.clone()).await;
    let client = client_for(&base);

    let page = client.fetch_page(1).await.unwrap();

    assert_eq!(page.tickets.len(), 2);
    assert!(!page.meta.has_more());
    assert_eq!(
        fake.seen_auth.lock().unwrap().as_slice(),
        ["Token token=s3cret".to_string()]
    );
    assert_eq!(
        fake.seen_paths.lock().unwrap().as_slice(),
        ["dddperth/2024?page=1".to_string()]
    );
}

#[tokio::test]
async fn client_maps_status_and_decode_failures() {
    let fake = FakeTito::new(vec![
        PageBehaviour::Status(StatusCode::SERVICE_UNAVAILABLE),
        PageBehaviour::Garbage,
    ]);
    let base = serve(fake).await;
    let client = client_for(&base);

    match client.fetch_page(1).await {
        Err(FetchError::RemoteUnavailable { page, reason }) => {
            assert_eq!(page, 1);
            assert!(reason.contains("503"));
            assert!(reason.contains("upstream unhappy"));
        }
        other => panic!("expected RemoteUnavailable, got {:?}", other),
    }
    assert!(matches!(
        client.fetch_page(2).await,
        Err(FetchError::Decode { page: 2, .. })
    ));
}

#[tokio::test]
async fn two_page_scenario_end_to_end() {
    let fake = FakeTito::new(vec![
        ok_page(&["a", "b", "c"]),
        ok_page(&["c", "d"]),
    ]);
    let base = serve(fake).await;

    let store = Arc::new(SqliteStorage::in_memory().await.unwrap());
    store
        .create_batch(
            &partition(),
            &[ticketsync_worker::storage::LocalTicket::new(
                partition(),
                TicketId::new("a").unwrap(),
                0,
            )],
        )
        .await
        .unwrap();
    let engine = engine_with(&base, store.clone(), 100);

    let report = engine.run_once().await.unwrap();
    assert_eq!(report.delta_count, 3);
    assert_eq!(report.inserted, 3);
    assert_eq!(
        store.all_ticket_ids(&partition()).await.unwrap(),
        id_set(&["a", "b", "c", "d"])
    );

    // Nothing new on the second run
    assert_eq!(engine.run_once().await.unwrap().inserted, 0);
}

#[tokio::test]
async fn failing_page_contains_run_and_next_run_catches_up() {
    let fake = FakeTito::new(vec![
        ok_page(&["a"]),
        ok_page(&["b"]),
        PageBehaviour::Status(StatusCode::BAD_GATEWAY),
        ok_page(&["d"]),
        ok_page(&["e"]),
    ]);
    let base = serve(fake.clone()).await;
    let store = Arc::new(SqliteStorage::in_memory().await.unwrap());
    let engine = engine_with(&base, store.clone(), 100);

    let first = engine.run_once().await.unwrap();
    assert!(!first.walk_complete);
    assert_eq!(first.pages_fetched, 2);
    assert_eq!(
        store.all_ticket_ids(&partition()).await.unwrap(),
        id_set(&["a", "b"])
    );

    fake.set_page(3, ok_page(&["c"]));
    let second = engine.run_once().await.unwrap();
    assert!(second.walk_complete);
    assert_eq!(second.inserted, 3);
    assert_eq!(store.count(&partition()).await.unwrap(), 5);
}

#[tokio::test]
async fn cap_spreads_large_delta_over_runs() {
    let ids: Vec<String> = (0..150).map(|i| format!("t{}", i)).collect();
    let pages: Vec<PageBehaviour> = ids
        .chunks(40)
        .map(|chunk| PageBehaviour::Ok(chunk.to_vec()))
        .collect();
    let base = serve(FakeTito::new(pages)).await;
    let store = Arc::new(SqliteStorage::in_memory().await.unwrap());
    let engine = engine_with(&base, store.clone(), 100);

    let first = engine.run_once().await.unwrap();
    assert_eq!(first.pages_fetched, 4);
    assert_eq!(first.inserted, 100);
    assert_eq!(first.deferred, 50);

    let second = engine.run_once().await.unwrap();
    assert_eq!(second.delta_count, 50);
    assert_eq!(second.inserted, 50);

    let third = engine.run_once().await.unwrap();
    assert_eq!(third.inserted, 0);
    assert_eq!(store.count(&partition()).await.unwrap(), 150);
}

#[tokio::test]
async fn undecodable_page_ends_walk_without_failing_run() {
    let fake = FakeTito::new(vec![
        ok_page(&["a", "b"]),
        PageBehaviour::Garbage,
        ok_page(&["c"]),
    ]);
    let base = serve(fake.clone()).await;
    let store = Arc::new(SqliteStorage::in_memory().await.unwrap());
    let engine = engine_with(&base, store.clone(), 100);

    let report = engine.run_once().await.unwrap();
    assert!(!report.walk_complete);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(
        store.all_ticket_ids(&partition()).await.unwrap(),
        id_set(&["a", "b"])
    );
    assert_eq!(fake.seen_paths.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn blank_ticket_id_does_not_block_later_pages() {
    let fake = FakeTito::new(vec![
        ok_page(&["a"]),
        ok_page(&["good1", "", "good2"]),
        ok_page(&["z"]),
    ]);
    let base = serve(fake).await;
    let store = Arc::new(SqliteStorage::in_memory().await.unwrap());
    let engine = engine_with(&base, store.clone(), 100);

    let report = engine.run_once().await.unwrap();
    assert!(report.walk_complete);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(
        store.all_ticket_ids(&partition()).await.unwrap(),
        id_set(&["a", "good1", "good2", "z"])
    );
}
