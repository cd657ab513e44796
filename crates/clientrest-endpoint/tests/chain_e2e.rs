//! End-to-end chain tests.
//!
//! Runs requests through the same global chain the `/v1` API mounts
//! (content type, recovery, logging) around handlers adapted with
//! `with_error`, and checks what reaches the wire.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use clientrest_endpoint::stages::REQUEST_ID_HEADER;
use clientrest_endpoint::{
    created, invoke, ok, with_body, with_error, ApiError, Chain, ContentTypeJson, Handler,
    HandlerContext, HandlerResult, MiddlewareContext, Recovery, Request, RequestLogging, Response,
    APPLICATION_JSON,
};
use clientrest_telemetry::Logger;
use http::header::{CONTENT_TYPE, RETRY_AFTER};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Default)]
struct Inventory {
    items: AtomicU32,
}

#[derive(Deserialize)]
struct AddItems {
    count: u32,
}

async fn count(ctx: HandlerContext<Inventory>) -> HandlerResult {
    let items = ctx.service().items.load(Ordering::SeqCst);
    Ok(ok(vec![with_body(json!({ "items": items }))]))
}

async fn add(ctx: HandlerContext<Inventory>) -> HandlerResult {
    let body: AddItems = ctx.json()?;
    let total = ctx.service().items.fetch_add(body.count, Ordering::SeqCst) + body.count;
    Ok(created(vec![with_body(json!({ "items": total }))]))
}

async fn maintenance(_ctx: HandlerContext<Inventory>) -> HandlerResult {
    Err(ApiError::service_unavailable("inventory is being restocked").into())
}

async fn broken(_ctx: HandlerContext<Inventory>) -> HandlerResult {
    Err(anyhow::anyhow!("disk quota exceeded on /var/lib/inventory").into())
}

async fn explode(_ctx: HandlerContext<Inventory>) -> HandlerResult {
    panic!("inventory index out of range")
}

fn global_chain() -> Chain {
    Chain::new()
        .with(ContentTypeJson::new())
        .with(Recovery::new(Logger::disabled()))
        .with(RequestLogging::new(Logger::disabled()))
}

fn make_request(method: Method, path: &str, body: &'static str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(path)
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

async fn dispatch(
    handler: &Handler<Inventory>,
    service: &Arc<Inventory>,
    request: Request,
) -> Response {
    global_chain()
        .process(MiddlewareContext::new(), request, |ctx, req| {
            invoke(handler, service, ctx, req)
        })
        .await
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_common_headers(response: &Response) {
    assert_eq!(response.headers()[CONTENT_TYPE], APPLICATION_JSON);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn test_success_flow() {
    let service = Arc::new(Inventory::default());

    let response = dispatch(
        &with_error(add),
        &service,
        make_request(Method::POST, "/v1/items", r#"{"count": 3}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_common_headers(&response);
    assert_eq!(body_json(response).await, json!({"items": 3}));

    let response = dispatch(
        &with_error(count),
        &service,
        make_request(Method::GET, "/v1/items", ""),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"items": 3}));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let service = Arc::new(Inventory::default());
    let response = dispatch(
        &with_error(add),
        &service,
        make_request(Method::POST, "/v1/items", "{\"count\": \"many\"}"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_common_headers(&response);
    assert_eq!(body_json(response).await["code"], 400);
    assert_eq!(service.items.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_service_unavailable_carries_retry_after() {
    let service = Arc::new(Inventory::default());
    let response = dispatch(
        &with_error(maintenance),
        &service,
        make_request(Method::GET, "/v1/items", ""),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_common_headers(&response);

    let retry_after = response.headers()[RETRY_AFTER].to_str().unwrap().to_string();
    assert!(httpdate::parse_http_date(&retry_after).is_ok());

    let body = body_json(response).await;
    assert_eq!(body["code"], 503);
    assert_eq!(body["message"], "inventory is being restocked");
}

#[tokio::test]
async fn test_opaque_error_is_hidden() {
    let service = Arc::new(Inventory::default());
    let response = dispatch(
        &with_error(broken),
        &service,
        make_request(Method::GET, "/v1/items", ""),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], 500);
    assert!(!body["message"].as_str().unwrap().contains("disk quota"));
}

#[tokio::test]
async fn test_panic_is_recovered() {
    let service = Arc::new(Inventory::default());
    let response = dispatch(
        &with_error(explode),
        &service,
        make_request(Method::GET, "/v1/items", ""),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_common_headers(&response);
    assert_eq!(body_json(response).await["code"], 500);
}

#[tokio::test]
async fn test_request_ids_differ_per_request() {
    let service = Arc::new(Inventory::default());
    let handler = with_error(count);

    let first = dispatch(&handler, &service, make_request(Method::GET, "/v1/items", "")).await;
    let second = dispatch(&handler, &service, make_request(Method::GET, "/v1/items", "")).await;
    assert_ne!(
        first.headers()[REQUEST_ID_HEADER],
        second.headers()[REQUEST_ID_HEADER]
    );
}
