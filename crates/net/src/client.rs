//! `UrlClient`: the URL collaborator spec.md §6 names ("performs
//! HTTP/1.1 with persistent connection... a process-wide cookie jar
//! with SameSite lax, a response cache keyed by URL with `max-age`,
//! and 3xx follow"). Grounded on
//! `BigBadE-valor/crates/page_handler/src/url.rs`'s scheme-dispatch
//! shape (http/https via `reqwest`, `file://` via filesystem read),
//! generalized to the `(headers, body)` contract spec.md §6 requires,
//! with cookie-jar/cache semantics from `original_source/network.py`.

use crate::cache::ResponseCache;
use crate::cookie_jar::CookieJar;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

pub type Headers = HashMap<String, String>;

/// Collaborator that resolves and fetches URLs on a tab's behalf.
/// Implementations are expected to be `Send + Sync` so a single
/// instance can be shared across tab threads (spec.md §9's
/// process-wide `SOCKET pool`).
pub trait UrlClient: Send + Sync {
    /// Performs the request, following the teacher's HTTP/1.1
    /// persistent-connection shape via `reqwest`'s pooled client.
    /// `referrer` informs `SameSite=Lax` cookie gating.
    ///
    /// # Errors
    /// Returns an error on network failure or an unsupported scheme;
    /// per spec.md §7 the caller treats this as "fail the request" and
    /// continues (stylesheet/script loads never abort navigation).
    fn request(&self, url: &Url, referrer: Option<&Url>, payload: Option<&str>) -> Result<(Headers, Vec<u8>)>;

    /// Resolves `relative` against `self`, per spec.md §6
    /// `URL.resolve`.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is not parsable.
    fn resolve(&self, base: &Url, relative: &str) -> Result<Url>;

    /// `scheme://host[:port]`, per spec.md §6 `URL.origin`.
    fn origin(&self, url: &Url) -> String;
}

/// `reqwest`-backed `UrlClient`: HTTP(S) via a pooled `reqwest::Client`
/// (persistent connections, 3xx follow are `reqwest`'s defaults),
/// `file://` via `std::fs`, plus the cookie jar and response cache
/// spec.md §6 requires.
pub struct ReqwestUrlClient {
    http: reqwest::blocking::Client,
    cookies: Mutex<CookieJar>,
    cache: Mutex<ResponseCache>,
}

impl ReqwestUrlClient {
    /// # Panics
    /// Panics if the underlying `reqwest` client cannot be built (TLS
    /// backend init failure) — an unrecoverable startup condition.
    #[must_use]
    pub fn new() -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent("cinder/0.1")
            .build()
            .unwrap_or_else(|err| unreachable!("reqwest client must build: {err}"));
        Self { http, cookies: Mutex::new(CookieJar::new()), cache: Mutex::new(ResponseCache::new()) }
    }
}

impl Default for ReqwestUrlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlClient for ReqwestUrlClient {
    fn request(&self, url: &Url, referrer: Option<&Url>, payload: Option<&str>) -> Result<(Headers, Vec<u8>)> {
        match url.scheme() {
            "file" => {
                let path = url.to_file_path().map_err(|()| anyhow!("invalid file url: {url}"))?;
                let body = std::fs::read(&path).map_err(|err| anyhow!("failed to read {}: {err}", path.display()))?;
                Ok((Headers::new(), body))
            }
            "http" | "https" => self.http_request(url, referrer, payload),
            other => Err(anyhow!("unsupported url scheme {other}")),
        }
    }

    fn resolve(&self, base: &Url, relative: &str) -> Result<Url> {
        base.join(relative).map_err(|err| anyhow!("cannot resolve {relative} against {base}: {err}"))
    }

    fn origin(&self, url: &Url) -> String {
        match url.port() {
            Some(port) => format!("{}://{}:{port}", url.scheme(), url.host_str().unwrap_or_default()),
            None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default()),
        }
    }
}

impl ReqwestUrlClient {
    fn http_request(&self, url: &Url, referrer: Option<&Url>, payload: Option<&str>) -> Result<(Headers, Vec<u8>)> {
        let key = url.as_str().to_owned();
        if payload.is_none() {
            if let Some(cached) = self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(&key) {
                return Ok(cached);
            }
        }

        let method = if payload.is_some() { reqwest::Method::POST } else { reqwest::Method::GET };
        let host = url.host_str().unwrap_or_default();
        let mut request = self.http.request(method.clone(), url.clone());

        {
            let jar = self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let referrer_host = referrer.and_then(url::Url::host_str);
            if let Some(cookie) = jar.cookie_for(host, method.as_str(), referrer_host) {
                request = request.header(reqwest::header::COOKIE, cookie);
            }
        }
        if let Some(body) = payload {
            request = request.body(body.to_owned());
        }

        let response = request.send().map_err(|err| anyhow!("request to {url} failed: {err}"))?;

        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_lowercase(), value.to_owned());
            }
        }
        if let Some(set_cookie) = response.headers().get(reqwest::header::SET_COOKIE).and_then(|v| v.to_str().ok()) {
            self.cookies.lock().unwrap_or_else(std::sync::PoisonError::into_inner).store(host, set_cookie);
        }

        let body = response.bytes().map_err(|err| anyhow!("reading body from {url} failed: {err}"))?.to_vec();

        if payload.is_none() {
            self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner).store(&key, headers.clone(), body.clone());
        }
        Ok((headers, body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]
mod tests {
    use super::*;

    #[test]
    fn origin_includes_explicit_port() {
        let client = ReqwestUrlClient::new();
        let url = Url::parse("http://example.com:8080/path").unwrap();
        assert_eq!(client.origin(&url), "http://example.com:8080");
    }

    #[test]
    fn origin_omits_default_port() {
        let client = ReqwestUrlClient::new();
        let url = Url::parse("https://example.com/path").unwrap();
        assert_eq!(client.origin(&url), "https://example.com");
    }

    #[test]
    fn resolve_handles_relative_paths() {
        let client = ReqwestUrlClient::new();
        let base = Url::parse("https://example.com/a/b.html").unwrap();
        let resolved = client.resolve(&base, "../c.css").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/c.css");
    }

    #[test]
    fn unsupported_scheme_is_an_error() {
        let client = ReqwestUrlClient::new();
        let url = Url::parse("ftp://example.com/").unwrap();
        assert!(client.request(&url, None, None).is_err());
    }
}
