//! End-to-end tests: axum ingress, worker pool, due scanner and a mock
//! webhook endpoint wired over an in-memory database and broker.

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use tokio::time::sleep;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use application::ports::{ApplicationStore, InstructionBroker, TaskStore};
use application::{
    ControlFlag, DueScanner, DueScannerConfig, EnqueueService, PollerConfig, TaskAccessPolicy,
    TaskPerformer, WorkerPool,
};
use domain::{ApiKey, Application, DueFactory, Instruction, Task, TaskId, TaskStatus};
use infrastructure::{
    AsyncDatabase, DeliveryConfig, MemoryBroker, SqliteApplicationStore, SqliteTaskStore,
    WebhookClient,
};
use presentation_http::{ApiKeyAuthLayer, AppState, create_router};

struct TestApp {
    server: TestServer,
    task_store: Arc<dyn TaskStore>,
    app_store: Arc<SqliteApplicationStore>,
    broker: Arc<dyn InstructionBroker>,
    app: Application,
    key: ApiKey,
    flag: ControlFlag,
    _db: AsyncDatabase,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.flag.clear();
    }
}

async fn spawn_app(require_auth: bool) -> TestApp {
    let db = AsyncDatabase::in_memory().await.unwrap();
    db.migrate().await.unwrap();

    let task_store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::new(db.pool().clone()));
    let app_store = Arc::new(SqliteApplicationStore::new(db.pool().clone()));
    let (app, key) = app_store.create("default").await.unwrap();

    let broker: Arc<dyn InstructionBroker> = Arc::new(MemoryBroker::new());
    let webhook = Arc::new(WebhookClient::new(&DeliveryConfig::default()).unwrap());
    let due_factory = DueFactory::new(Duration::from_secs(1800));
    let performer = Arc::new(TaskPerformer::new(
        Arc::clone(&task_store),
        webhook,
        due_factory,
        100,
    ));

    let flag = ControlFlag::new();
    let pool = WorkerPool::new(
        Arc::clone(&broker),
        Arc::clone(&task_store),
        performer,
        PollerConfig {
            min_delay: Duration::from_millis(5),
            max_empty_delay: Duration::from_millis(20),
            max_error_delay: Duration::from_millis(100),
            pop_timeout: Duration::from_millis(20),
            ..PollerConfig::default()
        },
        flag.clone(),
    );
    tokio::spawn(async move {
        let _ = pool.run().await;
    });

    let scanner = DueScanner::new(
        Arc::clone(&task_store),
        Arc::clone(&broker),
        DueScannerConfig {
            interval: Duration::from_millis(50),
            batch_limit: 100,
        },
    );
    let scanner_flag = flag.clone();
    tokio::spawn(async move {
        scanner.run(scanner_flag).await;
    });

    let state = AppState {
        enqueue: Arc::new(EnqueueService::new(
            Arc::clone(&task_store),
            Arc::clone(&broker),
            "x-hook-",
        )),
        task_store: Arc::clone(&task_store),
        access_policy: Arc::new(TaskAccessPolicy::new(app_store.clone())),
        default_timeout: 10,
    };
    let auth_layer = if require_auth {
        ApiKeyAuthLayer::required(app_store.clone())
    } else {
        ApiKeyAuthLayer::with_fallback(app_store.clone(), app.id)
    };
    let router = create_router(state).layer(auth_layer);
    let server = TestServer::new(router).unwrap();

    TestApp {
        server,
        task_store,
        app_store,
        broker,
        app,
        key,
        flag,
        _db: db,
    }
}

async fn wait_for_status(store: &Arc<dyn TaskStore>, id: TaskId, status: TaskStatus) -> Task {
    for _ in 0..200 {
        if let Some(task) = store.get(id).await.unwrap() {
            if task.status == status {
                return task;
            }
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("task {id} never reached {status}");
}

fn task_id_from_location(location: &str) -> TaskId {
    let id = location.rsplit('/').next().unwrap();
    TaskId::parse(id).unwrap()
}

#[tokio::test]
async fn happy_path_delivers_once_and_completes() {
    let app = spawn_app(false).await;
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&hook)
        .await;

    let response = app
        .server
        .post("/")
        .add_query_param("url", format!("{}/ok", hook.uri()))
        .add_query_param("timeout", "10")
        .text("char=a")
        .await;
    assert_eq!(response.status_code(), 201);

    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let id = task_id_from_location(&location);

    let task = wait_for_status(&app.task_store, id, TaskStatus::Completed).await;
    assert_eq!(task.retry_count, 1);

    let requests = hook.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, b"char=a");
}

#[tokio::test]
async fn server_error_then_success_retries_once() {
    let app = spawn_app(false).await;
    let hook = MockServer::start().await;
    // First attempt sees a 503, every later one a 200.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&hook)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&hook)
        .await;

    let response = app
        .server
        .post("/")
        .add_query_param("url", format!("{}/flaky", hook.uri()))
        .text("payload")
        .await;
    assert_eq!(response.status_code(), 201);
    let id = task_id_from_location(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap(),
    );

    let task = wait_for_status(&app.task_store, id, TaskStatus::Completed).await;
    assert_eq!(task.retry_count, 2);
    assert_eq!(hook.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn client_error_fails_fast_without_retry() {
    let app = spawn_app(false).await;
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&hook)
        .await;

    let response = app
        .server
        .post("/")
        .add_query_param("url", format!("{}/gone", hook.uri()))
        .text("payload")
        .await;
    let id = task_id_from_location(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap(),
    );

    let task = wait_for_status(&app.task_store, id, TaskStatus::Failed).await;
    assert_eq!(task.retry_count, 1);

    // Give the scanner time to misbehave if it were going to.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(hook.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_instructions_deliver_exactly_once() {
    let app = spawn_app(false).await;
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&hook)
        .await;

    let response = app
        .server
        .post("/")
        .add_query_param("url", format!("{}/once", hook.uri()))
        .text("payload")
        .await;
    let id = task_id_from_location(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap(),
    );

    // A duplicate of the initial instruction races the real one.
    app.broker.push(Instruction::initial(id)).await.unwrap();

    let task = wait_for_status(&app.task_store, id, TaskStatus::Completed).await;
    assert_eq!(task.retry_count, 1);
    assert_eq!(hook.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn enqueue_round_trip_resolves_location() {
    let app = spawn_app(false).await;
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&hook)
        .await;

    let response = app
        .server
        .post("/")
        .add_query_param("url", format!("{}/hook", hook.uri()))
        .text("body")
        .await;
    assert_eq!(response.status_code(), 201);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();

    let status = app.server.get(&location).await;
    assert_eq!(status.status_code(), 200);
    let json = status.json::<serde_json::Value>();
    let state = json["status"].as_str().unwrap();
    assert!(
        ["pending", "in_progress", "completed"].contains(&state),
        "unexpected status {state}"
    );
    assert_eq!(json["body"], "body");
}

#[tokio::test]
async fn missing_url_is_rejected_with_verbatim_message() {
    let app = spawn_app(false).await;
    let response = app.server.post("/").await;
    assert_eq!(response.status_code(), 400);
    assert!(
        response
            .text()
            .contains("You must provide a valid web hook URL.")
    );
}

#[tokio::test]
async fn invalid_timeout_is_rejected_with_verbatim_message() {
    let app = spawn_app(false).await;
    let response = app
        .server
        .post("/")
        .add_query_param("url", "http://example.com/hook")
        .add_query_param("timeout", "soon")
        .await;
    assert_eq!(response.status_code(), 400);
    assert!(
        response
            .text()
            .contains("You must provide a valid integer timeout.")
    );
}

#[tokio::test]
async fn unknown_task_is_404() {
    let app = spawn_app(false).await;
    let response = app.server.get("/tasks/999999").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = spawn_app(false).await;
    assert_eq!(app.server.get("/health").await.status_code(), 200);
    let ready = app.server.get("/ready").await;
    assert_eq!(ready.status_code(), 200);
    assert_eq!(ready.json::<serde_json::Value>()["status"], "ready");
}

#[tokio::test]
async fn required_auth_rejects_anonymous_enqueue() {
    let app = spawn_app(true).await;
    let response = app
        .server
        .post("/")
        .add_query_param("url", "http://example.com/hook")
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn required_auth_accepts_valid_key_and_scopes_reads() {
    let app = spawn_app(true).await;
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&hook)
        .await;

    let response = app
        .server
        .post("/")
        .authorization_bearer(&app.key.value)
        .add_query_param("url", format!("{}/hook", hook.uri()))
        .text("secret")
        .await;
    assert_eq!(response.status_code(), 201);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();

    // The owner reads its task.
    let owner_view = app
        .server
        .get(&location)
        .authorization_bearer(&app.key.value)
        .await;
    assert_eq!(owner_view.status_code(), 200);

    // A different application's key is refused.
    let (_, other_key) = app.app_store.create("other").await.unwrap();
    let foreign_view = app
        .server
        .get(&location)
        .authorization_bearer(&other_key.value)
        .await;
    assert_eq!(foreign_view.status_code(), 403);

    // An unknown key never gets in at all.
    let unknown = app.server.get(&location).authorization_bearer("junk").await;
    assert_eq!(unknown.status_code(), 401);
}

#[tokio::test]
async fn proxy_headers_reach_the_webhook() {
    let app = spawn_app(false).await;
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(wiremock::matchers::header("token", "abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&hook)
        .await;

    let response = app
        .server
        .post("/")
        .add_query_param("url", format!("{}/hook", hook.uri()))
        .add_header("x-hook-token", "abc")
        .text("payload")
        .await;
    let id = task_id_from_location(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap(),
    );
    wait_for_status(&app.task_store, id, TaskStatus::Completed).await;
}

#[tokio::test]
async fn bootstrap_app_owns_anonymous_tasks() {
    let app = spawn_app(false).await;
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&hook)
        .await;

    let response = app
        .server
        .post("/")
        .add_query_param("url", format!("{}/hook", hook.uri()))
        .await;
    let id = task_id_from_location(
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap(),
    );

    let task = app.task_store.get(id).await.unwrap().unwrap();
    assert_eq!(task.app_id, app.app.id);
}
