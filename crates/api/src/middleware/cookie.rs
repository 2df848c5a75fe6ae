//! Session cookie codec.
//!
//! Translates between a [`SessionId`] and the `Cookie` / `Set-Cookie` wire
//! format. The only configuration is the [`Environment`], which decides the
//! `Secure` attribute.

use axum::http::{HeaderMap, header::COOKIE};
use cookie::{Cookie, SameSite, time::Duration};

use receipts_core::SessionId;

use crate::config::Environment;
use crate::models::SESSION_TTL_SECONDS;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "receipt_session";

/// Encodes and decodes the session cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookieCodec {
    environment: Environment,
}

impl CookieCodec {
    #[must_use]
    pub const fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Extract the session id from a raw `Cookie` header value.
    ///
    /// Values are percent-decoded. Malformed pairs and empty session values
    /// are skipped, so the first non-empty `receipt_session` wins; a missing
    /// header or cookie yields `None`.
    #[must_use]
    pub fn decode(&self, cookie_header: Option<&str>) -> Option<SessionId> {
        Cookie::split_parse_encoded(cookie_header?)
            .filter_map(Result::ok)
            .filter(|cookie| cookie.name() == SESSION_COOKIE_NAME)
            .find_map(|cookie| {
                let value = cookie.value();
                (!value.is_empty()).then(|| SessionId::from_token(value))
            })
    }

    /// Extract the session id from request headers.
    ///
    /// Header names are case-insensitive, and every `Cookie` header is
    /// consulted.
    #[must_use]
    pub fn session_from_headers(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| self.decode(Some(value)))
    }

    /// `Set-Cookie` value establishing the session.
    #[must_use]
    pub fn encode_set(&self, session_id: &SessionId) -> String {
        self.build(session_id.as_str(), Duration::seconds(SESSION_TTL_SECONDS))
    }

    /// `Set-Cookie` value telling the browser to drop the session cookie.
    #[must_use]
    pub fn encode_clear(&self) -> String {
        self.build("", Duration::ZERO)
    }

    fn build(&self, value: &str, max_age: Duration) -> String {
        Cookie::build((SESSION_COOKIE_NAME, value))
            .http_only(true)
            .secure(self.environment.is_production())
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .build()
            .encoded()
            .to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn codec() -> CookieCodec {
        CookieCodec::new(Environment::Development)
    }

    /// Turn a `Set-Cookie` value into the `Cookie` header a browser would send.
    fn as_request_header(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn test_round_trip() {
        let generated = SessionId::generate();
        for token in [
            "a",
            "abc123",
            "Zm9vYmFy-_x",
            generated.as_str(),
            "a;b",
            " lead",
            "trail ",
            "in side",
            "x=y,z",
            "100%",
            "quote\"d",
        ] {
            let id = SessionId::from_token(token);
            let set_cookie = codec().encode_set(&id);

            assert_eq!(codec().decode(Some(&set_cookie)), Some(id.clone()), "{token:?}");
            assert_eq!(
                codec().decode(Some(&as_request_header(&set_cookie))),
                Some(id),
                "{token:?}"
            );
        }
    }

    #[test]
    fn test_generated_tokens_need_no_escaping() {
        let id = SessionId::generate();
        let header = codec().encode_set(&id);
        assert!(header.starts_with(&format!("receipt_session={};", id.as_str())));
    }

    #[test]
    fn test_empty_duplicate_does_not_hide_session() {
        assert_eq!(
            codec().decode(Some("receipt_session=; receipt_session=abc")),
            Some(SessionId::from_token("abc"))
        );
        assert_eq!(
            codec().decode(Some("receipt_session=abc; receipt_session=def")),
            Some(SessionId::from_token("abc"))
        );
    }

    #[test]
    fn test_set_attributes() {
        let header = codec().encode_set(&SessionId::from_token("tok"));

        assert!(header.starts_with("receipt_session=tok"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=604800"));
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn test_secure_in_production() {
        let codec = CookieCodec::new(Environment::Production);
        assert!(codec.encode_set(&SessionId::from_token("tok")).contains("Secure"));
        assert!(codec.encode_clear().contains("Secure"));
    }

    #[test]
    fn test_clear() {
        let header = codec().encode_clear();

        assert!(header.starts_with("receipt_session=;"));
        assert!(header.contains("Max-Age=0"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Path=/"));
        assert_eq!(codec().decode(Some(&as_request_header(&header))), None);
    }

    #[test]
    fn test_decode_among_other_cookies() {
        let header = "theme=dark; receipt_session=abc; lang=en";
        assert_eq!(
            codec().decode(Some(header)),
            Some(SessionId::from_token("abc"))
        );
    }

    #[test]
    fn test_decode_absent() {
        assert_eq!(codec().decode(None), None);
        assert_eq!(codec().decode(Some("")), None);
        assert_eq!(codec().decode(Some("theme=dark")), None);
    }

    #[test]
    fn test_decode_malformed_is_absent() {
        assert_eq!(codec().decode(Some(";;;=")), None);
        assert_eq!(codec().decode(Some("garbage without equals")), None);
        assert_eq!(
            codec().decode(Some("=novalue; receipt_session=ok")),
            Some(SessionId::from_token("ok"))
        );
    }

    #[test]
    fn test_session_from_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("receipt_session=xyz"));

        assert_eq!(
            codec().session_from_headers(&headers),
            Some(SessionId::from_token("xyz"))
        );
        assert_eq!(codec().session_from_headers(&HeaderMap::new()), None);
    }
}
