//! HTTP surface tests against an in-memory store and stand-in mailers.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use actix_web::{
    http::{header::LOCATION, StatusCode},
    test, web, App,
};
use async_trait::async_trait;
use status_board::{
    board::StatusBoard,
    dispatch::{sendgrid::SendGridMailer, Dispatcher, Mailer, Message, Sender},
    routes,
    store::{MemoryStore, RecordStore},
    structures::{
        errors::{DeliveryError, StoreError},
        model::StatusRecord,
    },
};
use tokio::sync::{mpsc, Semaphore};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Forwards every message to the test through a channel.
struct ChannelMailer {
    tx: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl Mailer for ChannelMailer {
    async fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        let _ = self.tx.send(message.clone());
        Ok(())
    }
}

/// Announces each send as it starts, then holds it until the gate has a permit.
struct GatedMailer {
    started: mpsc::UnboundedSender<String>,
    finished: mpsc::UnboundedSender<String>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl Mailer for GatedMailer {
    async fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        let _ = self.started.send(message.to.clone());
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        let _ = self.finished.send(message.to.clone());
        Ok(())
    }
}

/// Counts calls and fails every one of them.
#[derive(Default)]
struct BrokenStore {
    calls: AtomicUsize,
}

impl BrokenStore {
    fn fail(&self) -> StoreError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StoreError::Sqlx(sqlx::Error::PoolTimedOut)
    }
}

#[async_trait]
impl RecordStore for BrokenStore {
    async fn append(&self, _site_name: &str, _status: &str) -> Result<(), StoreError> {
        Err(self.fail())
    }

    async fn list_all(&self) -> Result<Vec<StatusRecord>, StoreError> {
        Err(self.fail())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        Err(self.fail())
    }
}

fn sender() -> Sender {
    Sender {
        name: "AutoDBData".to_string(),
        address: "board@example.com".to_string(),
    }
}

fn board(store: Arc<dyn RecordStore>, mailer: Arc<dyn Mailer>) -> web::Data<StatusBoard> {
    web::Data::new(StatusBoard::new(
        store,
        Dispatcher::new(mailer, sender()),
        "Sites Status",
    ))
}

fn channel_board() -> (web::Data<StatusBoard>, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let board = board(Arc::new(MemoryStore::new()), Arc::new(ChannelMailer { tx }));
    (board, rx)
}

fn assert_success_redirect(status: StatusCode, location: Option<&str>) {
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location, Some("/?success=true"));
}

#[actix_web::test]
async fn submit_list_and_send_report() {
    let (board, mut rx) = channel_board();
    let app = test::init_service(App::new().app_data(board).configure(routes::configure)).await;

    for (site, status) in [("api.example.com", "up"), ("db.example.com", "down")] {
        let req = test::TestRequest::post()
            .uri("/status/set")
            .set_form([("site-name", site), ("status", status)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_success_redirect(
            resp.status(),
            resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
        );
    }

    let req = test::TestRequest::get().uri("/view/all").to_request();
    let mut records: Vec<StatusRecord> = test::call_and_read_body_json(&app, req).await;
    records.sort_by(|a, b| a.site_name.cmp(&b.site_name));
    assert_eq!(
        records,
        vec![
            StatusRecord::new("api.example.com", "up"),
            StatusRecord::new("db.example.com", "down"),
        ]
    );

    let req = test::TestRequest::post()
        .uri("/send/all")
        .set_form([("email", "ops@example.com")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_success_redirect(
        resp.status(),
        resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
    );

    let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("report was not dispatched")
        .expect("mailer channel closed");
    assert_eq!(message.to, "ops@example.com");
    assert_eq!(message.from, sender());
    let lines: Vec<_> = message.text.lines().collect();
    assert!(lines.contains(&"api.example.com: up"));
    assert!(lines.contains(&"db.example.com: down"));
    assert!(message.html.contains("<li>api.example.com: up</li>"));
}

#[actix_web::test]
async fn send_responds_while_mail_is_still_in_flight() {
    let (started_tx, mut started) = mpsc::unbounded_channel();
    let (finished_tx, mut finished) = mpsc::unbounded_channel();
    let gate = Arc::new(Semaphore::new(0));
    let mailer = GatedMailer {
        started: started_tx,
        finished: finished_tx,
        gate: gate.clone(),
    };
    let board = board(Arc::new(MemoryStore::new()), Arc::new(mailer));
    board.submit("api.example.com", "up").await.unwrap();
    let app = test::init_service(App::new().app_data(board).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/send/all")
        .set_form([("email", "a@x"), ("email", "b@x")])
        .to_request();
    let resp = tokio::time::timeout(Duration::from_secs(2), test::call_service(&app, req))
        .await
        .expect("send/all waited for delivery");
    assert_success_redirect(
        resp.status(),
        resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
    );

    // both sends get going even though neither can finish
    let mut begun = Vec::new();
    for _ in 0..2 {
        let to = tokio::time::timeout(Duration::from_secs(5), started.recv())
            .await
            .expect("send did not start")
            .expect("mailer channel closed");
        begun.push(to);
    }
    begun.sort();
    assert_eq!(begun, vec!["a@x".to_string(), "b@x".to_string()]);
    assert!(finished.try_recv().is_err());

    gate.add_permits(2);
    for _ in 0..2 {
        tokio::time::timeout(Duration::from_secs(5), finished.recv())
            .await
            .expect("send did not finish after release")
            .expect("mailer channel closed");
    }
}

#[actix_web::test]
async fn list_is_json_array_even_when_empty() {
    let (board, _rx) = channel_board();
    let app = test::init_service(App::new().app_data(board).configure(routes::configure)).await;

    let req = test::TestRequest::get().uri("/view/all").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(test::read_body(resp).await, "[]");
}

#[actix_web::test]
async fn submit_accepts_query_string() {
    let (board, _rx) = channel_board();
    let app = test::init_service(
        App::new()
            .app_data(board.clone())
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/status/set?site-name=cache.example.com&status=degraded")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    assert_eq!(
        board.list_all().await.unwrap(),
        vec![StatusRecord::new("cache.example.com", "degraded")]
    );
}

#[actix_web::test]
async fn clear_then_list_is_empty() {
    let (board, _rx) = channel_board();
    let app = test::init_service(
        App::new()
            .app_data(board.clone())
            .configure(routes::configure),
    )
    .await;
    board.submit("api.example.com", "up").await.unwrap();
    board.submit("api.example.com", "up").await.unwrap();

    let req = test::TestRequest::post().uri("/delete/all").to_request();
    let resp = test::call_service(&app, req).await;
    assert_success_redirect(
        resp.status(),
        resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
    );

    let req = test::TestRequest::get().uri("/view/all").to_request();
    let records: Vec<StatusRecord> = test::call_and_read_body_json(&app, req).await;
    assert!(records.is_empty());
}

#[actix_web::test]
async fn send_without_recipients_is_rejected_before_store_access() {
    let store = Arc::new(BrokenStore::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let board = board(store.clone(), Arc::new(ChannelMailer { tx }));
    let app = test::init_service(App::new().app_data(board).configure(routes::configure)).await;

    for req in [
        test::TestRequest::post().uri("/send/all").to_request(),
        test::TestRequest::post()
            .uri("/send/all")
            .set_form([("email", " , ")])
            .to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert!(rx.try_recv().is_err());
}

#[actix_web::test]
async fn store_failures_are_server_errors() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let board = board(Arc::new(BrokenStore::default()), Arc::new(ChannelMailer { tx }));
    let app = test::init_service(App::new().app_data(board).configure(routes::configure)).await;

    let requests = [
        test::TestRequest::post()
            .uri("/status/set")
            .set_form([("site-name", "api.example.com"), ("status", "up")])
            .to_request(),
        test::TestRequest::get().uri("/view/all").to_request(),
        test::TestRequest::post()
            .uri("/send/all")
            .set_form([("email", "ops@example.com")])
            .to_request(),
        test::TestRequest::post().uri("/delete/all").to_request(),
    ];
    for req in requests {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(test::read_body(resp).await, "Database operation failed");
    }
}

#[actix_web::test]
async fn failing_recipient_does_not_block_others() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(body_string_contains("good@x"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(body_string_contains("bad@x"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid email"))
        .expect(1)
        .mount(&server)
        .await;

    let mailer = SendGridMailer::new(
        reqwest::Client::new(),
        server.uri(),
        "test-key",
        Duration::from_secs(5),
    );
    let board = board(Arc::new(MemoryStore::new()), Arc::new(mailer));
    board.submit("api.example.com", "up").await.unwrap();
    let app = test::init_service(App::new().app_data(board).configure(routes::configure)).await;

    let req = test::TestRequest::post()
        .uri("/send/all")
        .set_form([("email", "good@x"), ("email", "bad@x")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    // the sends run after the response, wait for both to reach the provider
    let mut received = 0;
    for _ in 0..50 {
        received = server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default();
        if received == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(received, 2);
    server.verify().await;
}

#[actix_web::test]
async fn landing_page_and_assets() {
    let (board, _rx) = channel_board();
    let app = test::init_service(App::new().app_data(board).configure(routes::configure)).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let body = std::str::from_utf8(&body).unwrap();
    assert!(body.contains("action=\"/status/set\""));
    assert!(!body.contains("class=\"success\""));

    let req = test::TestRequest::get().uri("/?success=true").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert!(std::str::from_utf8(&body)
        .unwrap()
        .contains("class=\"success\""));

    let req = test::TestRequest::get().uri("/assets/style.css").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/assets/nope.png").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
