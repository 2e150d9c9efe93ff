#[cfg(test)]
mod router_tests {
    use crate::{build_router, AppState, CaptureError, Config, MockPageCapturer, PageCapturer};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn png_of_size(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]));
        let mut data = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut data), image::ImageFormat::Png)
            .unwrap();
        data
    }

    fn app_with(capturer: MockPageCapturer, static_dir: Option<PathBuf>) -> Router {
        let mut config = Config::default();
        config.server.static_dir = static_dir;
        config.metrics_enabled = false;
        let capturer: Arc<dyn PageCapturer> = Arc::new(capturer);
        build_router(AppState::new(capturer, &config))
    }

    fn capture_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/capture")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_capture_prefixes_https() {
        let png = png_of_size(8, 8);
        let mut capturer = MockPageCapturer::new();
        capturer
            .expect_capture()
            .withf(|url: &str| url == "https://example.com/")
            .times(1)
            .returning(move |_| Ok(png.clone()));

        let response = app_with(capturer, None)
            .oneshot(capture_request(r#"{"url": "example.com"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_capture_defaults_to_png_attachment() {
        let png = png_of_size(8, 8);
        let expected = png.clone();
        let mut capturer = MockPageCapturer::new();
        capturer
            .expect_capture()
            .times(1)
            .returning(move |_| Ok(png.clone()));

        let response = app_with(capturer, None)
            .oneshot(capture_request(r#"{"url": "https://example.com"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"webpage_capture_"));
        assert!(disposition.ends_with(".png\""));
        assert_eq!(body_bytes(response).await, expected);
    }

    #[tokio::test]
    async fn test_capture_explicit_png() {
        let png = png_of_size(8, 8);
        let mut capturer = MockPageCapturer::new();
        capturer
            .expect_capture()
            .returning(move |_| Ok(png.clone()));

        let response = app_with(capturer, None)
            .oneshot(capture_request(r#"{"url": "example.com", "format": "png"}"#))
            .await
            .unwrap();

        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn test_capture_pdf() {
        let png = png_of_size(40, 120);
        let mut capturer = MockPageCapturer::new();
        capturer
            .expect_capture()
            .returning(move |_| Ok(png.clone()));

        let response = app_with(capturer, None)
            .oneshot(capture_request(r#"{"url": "example.com", "format": "pdf"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.ends_with(".pdf\""));

        let pdf = body_bytes(response).await;
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_url_is_bad_request_without_capture() {
        let mut capturer = MockPageCapturer::new();
        capturer.expect_capture().never();
        let app = app_with(capturer, None);

        for body in [r#"{}"#, r#"{"url": null}"#, r#"{"url": "  ", "format": "pdf"}"#] {
            let response = app.clone().oneshot(capture_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
            let json = body_json(response).await;
            assert_eq!(json["error"], "URL is required");
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let mut capturer = MockPageCapturer::new();
        capturer.expect_capture().never();

        let response = app_with(capturer, None)
            .oneshot(capture_request("{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_capture_failure_is_server_error() {
        let mut capturer = MockPageCapturer::new();
        capturer.expect_capture().times(1).returning(|_| {
            Err(CaptureError::Navigation(
                "https://nope.invalid/: net::ERR_NAME_NOT_RESOLVED".to_string(),
            ))
        });

        let response = app_with(capturer, None)
            .oneshot(capture_request(r#"{"url": "nope.invalid"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = body_json(response).await["error"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(error.starts_with("Capture failed: "));
        assert!(error.contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        for uri in ["/health", "/api/health", "/api/capture/health"] {
            let response = app_with(MockPageCapturer::new(), None)
                .oneshot(get(uri))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "uri: {uri}");
            assert_eq!(body_json(response).await["status"], "healthy");
        }
    }

    #[tokio::test]
    async fn test_users_placeholder() {
        let response = app_with(MockPageCapturer::new(), None)
            .oneshot(get("/api/users"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Users endpoint");
        assert_eq!(json["status"], "active");
    }

    #[tokio::test]
    async fn test_static_not_configured() {
        let response = app_with(MockPageCapturer::new(), None)
            .oneshot(get("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_fallback_page_without_bundle() {
        let dir = tempfile::tempdir().unwrap();

        let response = app_with(MockPageCapturer::new(), Some(dir.path().to_path_buf()))
            .oneshot(get("/some/client/route"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("/api/capture/health"));
    }

    #[tokio::test]
    async fn test_static_serves_files_and_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>spa</html>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        let app = app_with(MockPageCapturer::new(), Some(dir.path().to_path_buf()));

        let response = app.clone().oneshot(get("/app.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"console.log(1)");

        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"<html>spa</html>");

        let response = app.oneshot(get("/dashboard")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"<html>spa</html>");
    }

    /// Sleeps inside `capture` and records how many calls overlapped
    struct SlowCapturer {
        png: Vec<u8>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PageCapturer for SlowCapturer {
        async fn capture(&self, _url: &str) -> Result<Vec<u8>, CaptureError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(self.png.clone())
        }
    }

    async fn peak_concurrency(max_concurrent_captures: Option<usize>) -> usize {
        let capturer = Arc::new(SlowCapturer {
            png: png_of_size(4, 4),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let config = Config {
            max_concurrent_captures,
            metrics_enabled: false,
            ..Default::default()
        };
        let app = build_router(AppState::new(capturer.clone(), &config));

        let (first, second, third) = tokio::join!(
            app.clone().oneshot(capture_request(r#"{"url": "a.example"}"#)),
            app.clone().oneshot(capture_request(r#"{"url": "b.example"}"#)),
            app.oneshot(capture_request(r#"{"url": "c.example"}"#)),
        );
        assert_eq!(first.unwrap().status(), StatusCode::OK);
        assert_eq!(second.unwrap().status(), StatusCode::OK);
        assert_eq!(third.unwrap().status(), StatusCode::OK);

        capturer.peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_concurrency_bound_serializes_captures() {
        assert_eq!(peak_concurrency(Some(1)).await, 1);
        assert_eq!(peak_concurrency(Some(2)).await, 2);
    }

    #[tokio::test]
    async fn test_unbounded_captures_overlap() {
        assert_eq!(peak_concurrency(None).await, 3);
    }
}
