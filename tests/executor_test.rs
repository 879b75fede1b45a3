use std::sync::Arc;
use std::time::Duration;

use apiflow::cache::FileStorage;
use apiflow::prelude::*;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor_for(server: &MockServer) -> Executor {
    Executor::builder()
        .config(
            ExecutorConfig::builder()
                .base_url(server.uri())
                .header("accept", "application/json")
                .build(),
        )
        .build()
        .unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

#[tokio::test]
async fn cached_get_hits_the_network_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/7"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "A"})))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server);
    executor
        .register_endpoint(
            EndpointDescriptor::builder("users.get", "/users/:id")
                .cache(CachePolicy::process(Duration::from_secs(60)))
                .build(),
        )
        .unwrap();

    let first: User = executor
        .execute_as("users.get", CallOptions::new().path("id", 7), CallContext::new())
        .await
        .unwrap();
    let second: User = executor
        .execute_as("users.get", CallOptions::new().path("id", 7), CallContext::new())
        .await
        .unwrap();
    assert_eq!(first, User { id: 7, name: "A".into() });
    assert_eq!(first, second);
}

#[tokio::test]
async fn durable_cache_survives_executor_restart() {
    let server = MockServer::start().await;
    Mock::given(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"theme": "dark"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let endpoint = || {
        EndpointDescriptor::builder("config", "/config")
            .cache(CachePolicy::durable(Duration::from_secs(300)))
            .build()
    };
    let build = || {
        let executor = Executor::builder()
            .config(
                ExecutorConfig::builder()
                    .base_url(server.uri())
                    .durable_cache_dir(dir.path())
                    .build(),
            )
            .build()
            .unwrap();
        executor.register_endpoint(endpoint()).unwrap();
        executor
    };

    let first = build()
        .execute("config", CallOptions::new(), CallContext::new())
        .await
        .unwrap();
    let restarted = build();
    let second = restarted
        .execute("config", CallOptions::new(), CallContext::new())
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(restarted.cache().get_stats().await.durable, 1);
}

#[tokio::test]
async fn explicit_durable_storage_is_used() {
    let server = MockServer::start().await;
    Mock::given(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::builder()
        .config(ExecutorConfig::builder().base_url(server.uri()).build())
        .durable_storage(Arc::new(FileStorage::new(dir.path())))
        .build()
        .unwrap();
    executor
        .register_endpoint(
            EndpointDescriptor::builder("a", "/a")
                .cache(CachePolicy::durable(Duration::from_secs(60)))
                .build(),
        )
        .unwrap();
    executor
        .execute("a", CallOptions::new(), CallContext::new())
        .await
        .unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn retry_interceptor_recovers_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(path("/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "busy"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server);
    executor.add_interceptor(
        InterceptorRegistration::new(Arc::new(RetryInterceptor::new(
            executor.transport(),
            RetryPolicy::new(3)
                .with_delays(Duration::from_millis(10), Duration::from_millis(50))
                .with_jitter(false),
        )))
        .named("retry"),
    );
    executor
        .register_endpoint(EndpointDescriptor::builder("flaky", "/flaky").build())
        .unwrap();

    let value = executor
        .execute("flaky", CallOptions::new(), CallContext::new())
        .await
        .unwrap();
    assert_eq!(value, json!({"ok": true}));
}

#[tokio::test]
async fn validation_errors_reach_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "invalid",
            "errors": {"email": ["taken"]}
        })))
        .mount(&server)
        .await;

    let executor = executor_for(&server);
    executor
        .register_endpoint(
            EndpointDescriptor::builder("users.create", "/users")
                .method(HttpMethod::Post)
                .build(),
        )
        .unwrap();

    let err = executor
        .execute(
            "users.create",
            CallOptions::new().body(json!({"email": "a@b.c"})),
            CallContext::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(err.status(), 422);
    assert_eq!(err.field_errors().unwrap()["email"], vec!["taken".to_string()]);
}

#[tokio::test]
async fn group_endpoints_with_pagination_and_query() {
    let server = MockServer::start().await;
    Mock::given(path("/users"))
        .and(query_param("page", "3"))
        .and(query_param("pageSize", "10"))
        .and(query_param("tags", "a,b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server);
    let ids = executor
        .register_group(
            EndpointGroup::new("users").with_url_prefix("/users").endpoint(
                EndpointDescriptor::builder("list", "")
                    .pagination(PaginationPolicy::default().with_default_size(10))
                    .build(),
            ),
        )
        .unwrap();
    assert_eq!(ids, vec!["users.list".to_string()]);

    let value = executor
        .execute(
            "users.list",
            CallOptions::new().page(3).query("tags", json!(["a", "b"])).query("skip", json!(null)),
            CallContext::new(),
        )
        .await
        .unwrap();
    assert_eq!(value, json!([]));
}

#[tokio::test]
async fn auth_interceptor_rewrites_headers() {
    let server = MockServer::start().await;
    Mock::given(path("/me"))
        .and(header("authorization", "Bearer t0k"))
        .respond_with(ResponseTemplate::new(200).set_body_string("me"))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server);
    executor.add_interceptor(
        InterceptorRegistration::new(Arc::new(HookInterceptor::new().on_request(|mut req, _| {
            req.headers.insert(
                "authorization",
                "Bearer t0k"
                    .parse()
                    .map_err(|_| ApiError::internal("bad header"))?,
            );
            Ok(req)
        })))
        .named("auth")
        .with_priority(10),
    );
    executor
        .register_endpoint(EndpointDescriptor::builder("me", "/me").build())
        .unwrap();

    let value = executor
        .execute("me", CallOptions::new(), CallContext::new())
        .await
        .unwrap();
    assert_eq!(value, json!("me"));
}
