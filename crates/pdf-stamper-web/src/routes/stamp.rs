//! Stamp route - fetch, stamp and upload a document in one request.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use pdf_stamper_core::StampPayload;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::helpers::{ResultExt, RouteResult};
use crate::state::AppState;

/// Success body of `POST /api/stamp`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StampResponse {
    pub stamped_url: String,
    /// Raw object store response, passed through untouched
    pub cloudinary: Value,
}

/// Stamp the posted document and return where the result was stored.
///
/// Malformed JSON and a missing `fileUrl` are rejected with 400 before any
/// network traffic; every later failure is a 500.
pub async fn stamp(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StampPayload>, JsonRejection>,
) -> RouteResult<Json<StampResponse>> {
    let Json(payload) = payload.or_bad_request()?;
    let request = payload.into_request()?;

    info!(
        "Stamp request for {} ({} fields)",
        request.source_url,
        request.layout.fields.len()
    );

    let outcome = state.stamper().stamp_and_upload(&request).await?;

    Ok(Json(StampResponse {
        stamped_url: outcome.url,
        cloudinary: outcome.raw,
    }))
}

/// Any method other than POST on the stamp endpoint.
pub async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use bytes::Bytes;
    use lopdf::{Dictionary, Document, Object, Stream};
    use pdf_stamper_core::{Error, Fetcher, ObjectStore, Result, Stamper, UploadResult};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::router;

    const DOC_URL: &str = "https://files.example/doc.pdf";

    /// Serves a one-page PDF at `DOC_URL`; everything else is 404.
    #[derive(Default)]
    struct MockFetcher {
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes> {
            self.requested.lock().unwrap().push(url.to_string());
            if url == DOC_URL {
                Ok(Bytes::from(one_page_pdf()))
            } else {
                Err(Error::Fetch {
                    url: url.to_string(),
                    status: 404,
                })
            }
        }
    }

    struct MockStore;

    #[async_trait]
    impl ObjectStore for MockStore {
        async fn upload(&self, _pdf: Vec<u8>, filename: &str) -> Result<UploadResult> {
            Ok(UploadResult {
                url: format!("https://res.example/{filename}"),
                raw: json!({"secure_url": format!("https://res.example/{filename}"), "bytes": 1234}),
            })
        }
    }

    fn one_page_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn app(with_store: bool) -> (axum::Router, Arc<MockFetcher>) {
        let fetcher = Arc::new(MockFetcher::default());
        let mut stamper = Stamper::new(fetcher.clone());
        if with_store {
            stamper = stamper.with_store(Arc::new(MockStore));
        }
        let state = Arc::new(AppState::with_stamper(stamper));
        (router(state), fetcher)
    }

    fn post_json(body: impl Into<Body>) -> Request<Body> {
        Request::post("/api/stamp")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_is_method_not_allowed() {
        let (app, _) = app(true);
        let response = app
            .oneshot(Request::get("/api/stamp").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Method Not Allowed");
    }

    #[tokio::test]
    async fn test_missing_file_url() {
        let (app, fetcher) = app(true);
        let response = app
            .oneshot(post_json(json!({"parsedFields": {"name": "Alice"}}).to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await, json!({"error": "fileUrl required"}));
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (app, _) = app(true);
        let response = app.oneshot(post_json("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_source_fetch_failure_is_internal_error() {
        let (app, _) = app(true);
        let response = app
            .oneshot(post_json(
                json!({"fileUrl": "https://files.example/missing.pdf"}).to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("failed to fetch original PDF")
        );
    }

    #[tokio::test]
    async fn test_stamp_success() {
        let (app, fetcher) = app(true);
        let response = app
            .oneshot(post_json(
                json!({
                    "fileUrl": DOC_URL,
                    "parsedFields": {"name": "Alice"},
                    "fieldPositions": {"name": {"x": 50, "y": 700, "size": 12}}
                })
                .to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["stampedUrl"], "https://res.example/stamped.pdf");
        assert_eq!(body["cloudinary"]["bytes"], 1234);
        assert_eq!(*fetcher.requested.lock().unwrap(), vec![DOC_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_stamp_without_upload_config() {
        let (app, _) = app(false);
        let response = app
            .oneshot(post_json(json!({"fileUrl": DOC_URL}).to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("missing required config"));
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(false);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }
}
