//! Defines routes for the blob API.
//!
//! ## Structure
//! - **Authenticated API** (`Authorization: Bearer <token>`)
//!   - `PUT  /api/{*pathname}` - upload, or copy with `?fromUrl=`
//!   - `GET  /api/?url=...`    - object metadata
//!   - `GET  /api/`            - list the caller's store
//!   - `POST /api/delete`      - delete `{"urls": [...]}`
//!
//! - **Public**
//!   - `GET /public/{*rest}`   - download (`?download=1` for attachment)
//!   - `GET /`                 - redirect to documentation
//!   - `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        blob_handlers::{delete_blobs, download_blob, get_blobs, put_blob, root_redirect},
        health_handlers::{healthz, readyz},
    },
    services::object_store::ObjectStore,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router. Handlers share the `ObjectStore` as state.
pub fn routes() -> Router<ObjectStore> {
    Router::new()
        .route("/", get(root_redirect))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api", get(get_blobs))
        .route("/api/", get(get_blobs))
        .route("/api/delete", post(delete_blobs))
        .route("/api/{*pathname}", get(get_blobs).put(put_blob))
        .route("/public/{*rest}", get(download_blob))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        address::AddressScheme, content_store::ContentStore, metadata_index::MetadataIndex,
    };
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    const TOKEN: &str = "Bearer vercel_blob_rw_tenantA_secret";

    async fn app() -> (TempDir, ObjectStore, Router) {
        let dir = tempdir().unwrap();
        let content = ContentStore::new(dir.path().join("content"));
        content.init().await.unwrap();
        let index = MetadataIndex::open(dir.path().join("index"), false)
            .await
            .unwrap();
        let store = ObjectStore::new(content, index, AddressScheme::new("http://localhost:3001"));
        let router = routes().with_state(store.clone());
        (dir, store, router)
    }

    fn put_request(path: &str, body: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri(path)
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn public_path(url: &str) -> String {
        url.strip_prefix("http://localhost:3001").unwrap().to_string()
    }

    #[tokio::test]
    async fn put_head_download_list_delete() {
        let (_dir, store, app) = app().await;

        let mut req = put_request("/api/notes/hello.txt", b"hello world");
        req.headers_mut()
            .insert("x-cache-control-max-age", "600".parse().unwrap());
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let put = json_body(resp).await;
        let url = put["url"].as_str().unwrap().to_string();
        assert_eq!(url, "http://localhost:3001/public/tenantA/notes/hello.txt");
        assert_eq!(put["pathname"], "notes/hello.txt");
        assert_eq!(put["contentType"], "text/plain; charset=utf-8");
        assert_eq!(put["contentDisposition"], "inline; filename=\"hello.txt\"");

        let resp = app
            .clone()
            .oneshot(get_request(&format!("/api/?url={url}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let head = json_body(resp).await;
        assert_eq!(head["size"], 11);
        assert_eq!(head["cacheControl"], "public, max-age=600, s-maxage=300");

        let resp = app
            .clone()
            .oneshot(get_request(&format!("{}?download=1", public_path(&url))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"hello.txt\""
        );
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "11");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello world");

        let resp = app.clone().oneshot(get_request("/api/")).await.unwrap();
        let list = json_body(resp).await;
        assert_eq!(list["hasMore"], false);
        assert_eq!(list["blobs"].as_array().unwrap().len(), 1);
        assert_eq!(list["blobs"][0]["url"], url.as_str());

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/delete")
            .header(header::AUTHORIZATION, TOKEN)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "urls": [url] }).to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .clone()
            .oneshot(get_request(&public_path(&url)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(store.list("tenantA").await.unwrap().is_empty());
        store.close().await;
    }

    #[tokio::test]
    async fn copy_via_from_url() {
        let (_dir, store, app) = app().await;

        let resp = app
            .clone()
            .oneshot(put_request("/api/src.bin", b"\x00\x01\x02"))
            .await
            .unwrap();
        let src = json_body(resp).await["url"].as_str().unwrap().to_string();

        let mut req = put_request(&format!("/api/dst.bin?fromUrl={src}"), b"");
        req.headers_mut()
            .insert("x-add-random-suffix", "1".parse().unwrap());
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let copy = json_body(resp).await;
        assert_eq!(copy["pathname"], "dst.bin");
        assert_ne!(copy["url"].as_str().unwrap(), src);

        let copied = store.get(copy["url"].as_str().unwrap()).await.unwrap();
        assert_eq!(copied.size, 3);

        let req = put_request(
            "/api/dst.bin?fromUrl=http://localhost:3001/public/tenantA/ghost.bin",
            b"",
        );
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        store.close().await;
    }

    #[tokio::test]
    async fn api_requires_authorization() {
        let (_dir, store, app) = app().await;

        let req = Request::builder()
            .uri("/api/")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/api/")
            .header(header::AUTHORIZATION, "Bearer short_token")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        store.close().await;
    }

    #[tokio::test]
    async fn head_of_unknown_url_is_404() {
        let (_dir, store, app) = app().await;

        let resp = app
            .oneshot(get_request(
                "/api/?url=http://localhost:3001/public/tenantA/nope.txt",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        store.close().await;
    }

    #[tokio::test]
    async fn malformed_delete_body_is_400() {
        let (_dir, store, app) = app().await;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/delete")
            .header(header::AUTHORIZATION, TOKEN)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"nope\": true}"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        store.close().await;
    }

    #[tokio::test]
    async fn root_redirects_and_health_is_ok() {
        let (_dir, store, app) = app().await;

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        store.close().await;
    }
}
