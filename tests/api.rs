use std::io::{Cursor, Read};
use std::num::NonZeroUsize;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
    routing::get,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use calamine::{Data, Reader, Xlsx};
use docrender::application::docx::{DocxRenderConfig, DocxRenderer, FALLBACK_NOTICE};
use docrender::application::xlsx::XlsxRenderer;
use docrender::config::LimitSettings;
use docrender::infra::http::{
    ApiState, RENDER_FIDELITY_HEADER, build_api_router, build_router, with_http_layers,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use zip::ZipArchive;

fn limits(bytes: usize) -> LimitSettings {
    LimitSettings {
        max_request_bytes: NonZeroUsize::new(bytes).expect("non-zero limit"),
    }
}

fn app() -> Router {
    build_router(ApiState::default(), &limits(16 * 1024 * 1024))
}

fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.expect("router is infallible")
}

async fn json_body(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn decode_data(envelope: &Value) -> Vec<u8> {
    let data = envelope["data"].as_str().expect("data is a string");
    BASE64.decode(data).expect("standard base64")
}

fn document_xml(bytes: &[u8]) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("docx zip");
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .expect("word/document.xml")
        .read_to_string(&mut xml)
        .expect("utf-8");
    xml
}

fn fidelity(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(&RENDER_FIDELITY_HEADER)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn health_reports_ok() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request");
    let response = send(app(), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    insta::assert_json_snapshot!(json_body(response).await, @r#"
    {
      "status": "ok"
    }
    "#);
}

#[tokio::test]
async fn render_docx_returns_a_word_document() {
    let response = send(
        app(),
        post_json(
            "/render-docx",
            &json!({
                "html": "<html><body><h1>Quarterly Report</h1><p>Revenue grew <strong>12%</strong>.</p><ul><li>North</li><li>South</li></ul></body></html>",
                "title": "Q3"
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fidelity(&response), Some("full"));

    let envelope = json_body(response).await;
    assert_eq!(envelope["error"], json!(false));
    assert_eq!(envelope["message"], Value::Null);

    let xml = document_xml(&decode_data(&envelope));
    assert!(xml.contains("Quarterly Report"));
    assert!(xml.contains("Revenue grew"));
    assert!(xml.contains("North"));
    assert!(xml.contains("Heading1"));
}

#[tokio::test]
async fn render_docx_with_empty_fields_is_an_in_band_error() {
    for body in [
        json!({"html": "", "title": "Report"}),
        json!({"html": "<p>content</p>", "title": ""}),
    ] {
        let response = send(app(), post_json("/render-docx", &body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let envelope = json_body(response).await;
        insta::allow_duplicates! {
            insta::assert_json_snapshot!(envelope, @r#"
            {
              "data": null,
              "error": true,
              "message": "Missing html or title"
            }
            "#);
        }
    }
}

#[tokio::test]
async fn unconvertible_html_falls_back_to_title_and_notice() {
    let state = ApiState::new(
        DocxRenderer::new(DocxRenderConfig {
            max_nesting_depth: 4,
        }),
        XlsxRenderer::new(),
    );
    let router = build_router(state, &limits(1024 * 1024));
    let html = format!("{}buried text{}", "<div>".repeat(10), "</div>".repeat(10));

    let response = send(
        router,
        post_json("/render-docx", &json!({"html": html, "title": "Board Minutes"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fidelity(&response), Some("fallback"));

    let envelope = json_body(response).await;
    assert_eq!(envelope["error"], json!(false));

    let xml = document_xml(&decode_data(&envelope));
    assert!(xml.contains("Heading1"));
    assert!(xml.contains("Board Minutes"));
    assert!(xml.contains(FALLBACK_NOTICE));
    assert!(!xml.contains("buried text"));
}

#[tokio::test]
async fn missing_title_is_a_schema_failure_on_both_endpoints() {
    let cases = [
        ("/render-docx", json!({"html": "<p>x</p>"})),
        (
            "/render-xlsx",
            json!({"sheets": [{"name": "S", "headers": [], "rows": []}]}),
        ),
    ];

    for (path, body) in cases {
        let response = send(app(), post_json(path, &body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        let envelope = json_body(response).await;
        insta::allow_duplicates! {
            insta::assert_json_snapshot!(envelope, @r#"
            {
              "data": null,
              "error": true,
              "message": "Invalid request payload"
            }
            "#);
        }
    }
}

#[tokio::test]
async fn malformed_bodies_are_schema_failures() {
    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/render-docx")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"html\": "))
        .expect("request");
    let no_content_type = Request::builder()
        .method(Method::POST)
        .uri("/render-docx")
        .body(Body::from(r#"{"html":"<p>x</p>","title":"t"}"#))
        .expect("request");
    let boolean_cell = post_json(
        "/render-xlsx",
        &json!({
            "title": "T",
            "sheets": [{"name": "S", "headers": ["A"], "rows": [[true]]}]
        }),
    );

    for request in [malformed, no_content_type, boolean_cell] {
        let response = send(app(), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let envelope = json_body(response).await;
        assert_eq!(envelope["message"], json!("Invalid request payload"));
        assert_eq!(envelope["data"], Value::Null);
    }
}

#[tokio::test]
async fn oversized_bodies_are_schema_failures() {
    let router = build_router(ApiState::default(), &limits(64));
    let body = json!({"html": format!("<p>{}</p>", "x".repeat(256)), "title": "Big"});

    let response = send(router, post_json("/render-docx", &body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope = json_body(response).await;
    assert_eq!(envelope["message"], json!("Invalid request payload"));
}

#[tokio::test]
async fn render_xlsx_writes_sheets_in_order() {
    let response = send(
        app(),
        post_json(
            "/render-xlsx",
            &json!({
                "title": "Inventory",
                "sheets": [
                    {"name": "Quarterly revenue by region and product line", "headers": ["A", "B"], "rows": [[1, "x"], [2, null]]},
                    {"name": "Notes", "headers": [], "rows": [["free text"]]},
                    {"name": "Empty", "headers": [], "rows": []}
                ]
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fidelity(&response), Some("full"));
    let envelope = json_body(response).await;
    assert_eq!(envelope["error"], json!(false));

    let mut workbook = Xlsx::new(Cursor::new(decode_data(&envelope))).expect("xlsx");
    assert_eq!(
        workbook.sheet_names(),
        vec![
            "Quarterly revenue by region and".to_string(),
            "Notes".to_string(),
            "Empty".to_string(),
        ]
    );

    let range = workbook
        .worksheet_range("Quarterly revenue by region and")
        .expect("first sheet");
    let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
    assert_eq!(
        rows,
        vec![
            vec![Data::String("A".into()), Data::String("B".into())],
            vec![Data::Float(1.0), Data::String("x".into())],
            vec![Data::Float(2.0), Data::Empty],
        ]
    );
}

#[tokio::test]
async fn render_xlsx_without_sheets_is_an_in_band_error() {
    let response = send(
        app(),
        post_json("/render-xlsx", &json!({"title": "Nothing", "sheets": []})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    insta::assert_json_snapshot!(json_body(response).await, @r#"
    {
      "data": null,
      "error": true,
      "message": "At least one sheet is required"
    }
    "#);
}

#[tokio::test]
async fn duplicate_sheet_names_are_suffixed() {
    let response = send(
        app(),
        post_json(
            "/render-xlsx",
            &json!({
                "title": "Clash",
                "sheets": [
                    {"name": "Totals", "headers": [], "rows": []},
                    {"name": "Totals", "headers": [], "rows": []}
                ]
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let envelope = json_body(response).await;
    assert_eq!(envelope["error"], json!(false));

    let workbook = Xlsx::new(Cursor::new(decode_data(&envelope))).expect("xlsx");
    assert_eq!(
        workbook.sheet_names(),
        vec!["Totals".to_string(), "Totals1".to_string()]
    );
}

#[tokio::test]
async fn workbook_assembly_failures_are_reported_in_the_envelope() {
    let response = send(
        app(),
        post_json(
            "/render-xlsx",
            &json!({
                "title": "Bad names",
                "sheets": [{"name": "Q1/Q2", "headers": [], "rows": []}]
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(fidelity(&response).is_none());
    let envelope = json_body(response).await;
    assert_eq!(envelope["error"], json!(true));
    assert_eq!(envelope["data"], Value::Null);
    let message = envelope["message"].as_str().expect("message");
    assert!(
        message.starts_with("Unexpected error while rendering XLSX: "),
        "{message}"
    );
}

async fn explode() -> &'static str {
    panic!("handler blew up")
}

#[tokio::test]
async fn panics_outside_the_render_task_are_500s() {
    let router = with_http_layers(
        build_api_router(ApiState::default()).route("/explode", get(explode)),
        &limits(1024),
    );
    let request = Request::builder()
        .uri("/explode")
        .body(Body::empty())
        .expect("request");

    let response = send(router, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    insta::assert_json_snapshot!(json_body(response).await, @r#"
    {
      "data": null,
      "error": true,
      "message": "Internal server error"
    }
    "#);
}

#[tokio::test]
async fn unknown_routes_are_404() {
    let request = Request::builder()
        .uri("/render-pdf")
        .body(Body::empty())
        .expect("request");
    let response = send(app(), request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
