use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

/// Adds OWASP-recommended security headers to every response.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let swagger = request.uri().path().starts_with("/swagger-ui");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("x-xss-protection", HeaderValue::from_static("0"));
    // Swagger UI needs its own scripts and styles; everything else is JSON
    if !swagger {
        headers.insert(
            "content-security-policy",
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        );
    }
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Coordinates arrive as query parameters, never from the browser API
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
    );
    // Air quality is live data
    headers.insert("cache-control", HeaderValue::from_static("no-store"));

    let enable_hsts = std::env::var("ENABLE_HSTS")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);
    if enable_hsts {
        headers.insert(
            "strict-transport-security",
            HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/api/air", get(|| async { "{}" }))
            .route("/swagger-ui/index.html", get(|| async { "<html></html>" }))
            .layer(middleware::from_fn(security_headers_middleware))
    }

    async fn headers_for(uri: &str) -> axum::http::HeaderMap {
        app()
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .headers()
            .clone()
    }

    #[tokio::test]
    async fn test_api_responses_are_locked_down() {
        let headers = headers_for("/api/air").await;
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["cache-control"], "no-store");
        assert!(headers.contains_key("content-security-policy"));
    }

    #[tokio::test]
    async fn test_swagger_ui_skips_csp() {
        let headers = headers_for("/swagger-ui/index.html").await;
        assert!(!headers.contains_key("content-security-policy"));
        assert_eq!(headers["x-frame-options"], "DENY");
    }
}
