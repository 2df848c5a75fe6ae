//! CORS policy, applied as the outermost pipeline stage.
//!
//! Preflight (`OPTIONS`) requests are answered here and never reach the rest
//! of the pipeline. Every other request runs through, and the access-control
//! headers are merged onto whatever came back without overwriting headers the
//! inner layers already set.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
            ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
        },
    },
    middleware::Next,
    response::Response,
};
use url::{Host, Url};

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "content-type, x-request-id";
const EXPOSED_HEADERS: &str = "x-request-id";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Cross-origin access policy.
///
/// An origin is allowed when it is on the configured allow-list or is a local
/// development host (`localhost`, `*.localhost`, `127.0.0.1`, `[::1]` on any
/// port, over `http` or `https`).
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed_origins: Arc<[String]>,
}

impl CorsPolicy {
    pub fn new<I, S>(allowed_origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: allowed_origins
                .into_iter()
                .map(|origin| origin.into().trim_end_matches('/').to_owned())
                .collect(),
        }
    }

    /// Whether `origin` may make credentialed requests.
    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin) || is_local_development(origin)
    }

    /// Access-control headers for a request carrying `origin`.
    fn headers_for(&self, origin: Option<&HeaderValue>, preflight: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();

        match origin {
            None => {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
            Some(origin) => {
                headers.insert(VARY, HeaderValue::from_static("Origin"));
                let allowed = origin.to_str().is_ok_and(|value| self.allows(value));
                if !allowed {
                    tracing::debug!(origin = ?origin, "Origin not allowed");
                    return headers;
                }
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
                headers.insert(
                    ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
            }
        }

        headers.insert(
            ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSED_HEADERS),
        );
        if preflight {
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            headers.insert(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            );
            headers.insert(
                ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static(PREFLIGHT_MAX_AGE),
            );
        }

        headers
    }
}

/// Apply the CORS policy.
///
/// `OPTIONS` short-circuits with `200`, an empty body and access-control
/// headers only.
pub async fn cors_middleware(
    State(policy): State<CorsPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request.headers().get(ORIGIN).cloned();

    if request.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        *response.headers_mut() = policy.headers_for(origin.as_ref(), true);
        return response;
    }

    let mut response = next.run(request).await;
    merge_headers(
        response.headers_mut(),
        policy.headers_for(origin.as_ref(), false),
    );
    response
}

/// Add `extra` without replacing anything already present. `Vary` values are
/// appended since they form a list.
fn merge_headers(target: &mut HeaderMap, extra: HeaderMap) {
    for (name, value) in &extra {
        if *name == VARY {
            target.append(name, value.clone());
        } else if !target.contains_key(name) {
            target.insert(name, value.clone());
        }
    }
}

fn is_local_development(origin: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost" || domain.ends_with(".localhost"),
        Some(Host::Ipv4(ip)) => ip == Ipv4Addr::LOCALHOST,
        Some(Host::Ipv6(ip)) => ip == Ipv6Addr::LOCALHOST,
        None => false,
    }
}
