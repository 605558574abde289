//! Process-wide cookie jar, keyed by host, with `SameSite=Lax`
//! enforcement (spec.md §6 URL collaborator; spec.md §9 "Global FONT
//! cache, COOKIE_JAR, SOCKET pool: process-wide state with explicit
//! init"). Grounded on `original_source/network.py`'s `COOKIE_JAR`
//! handling in `URL.request`/response `Set-Cookie` parsing.

use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Entry {
    cookie: String,
    same_site_lax: bool,
}

/// Explicit-init process-wide cookie store; unit tests construct a
/// fresh instance instead of touching global state (spec.md §9).
#[derive(Debug, Default)]
pub struct CookieJar {
    entries: HashMap<String, Entry>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `Set-Cookie` response header and records it for `host`.
    pub fn store(&mut self, host: &str, set_cookie: &str) {
        let mut parts = set_cookie.split(';').map(str::trim);
        let Some(cookie) = parts.next() else { return };
        let same_site_lax = parts.any(|p| p.eq_ignore_ascii_case("samesite=lax") || p.eq_ignore_ascii_case("samesite"));
        self.entries.insert(host.to_owned(), Entry { cookie: cookie.to_owned(), same_site_lax });
    }

    /// Cookie header value to send for a request to `host`, given the
    /// request's `method` and `referrer_host` (site the navigation
    /// originated from, if any). `SameSite=Lax` blocks the cookie on a
    /// cross-site non-GET request.
    #[must_use]
    pub fn cookie_for(&self, host: &str, method: &str, referrer_host: Option<&str>) -> Option<&str> {
        let entry = self.entries.get(host)?;
        if entry.same_site_lax && method != "GET" {
            if let Some(referrer_host) = referrer_host {
                if referrer_host != host {
                    return None;
                }
            }
        }
        Some(&entry.cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_site_lax_blocks_cross_site_post() {
        let mut jar = CookieJar::new();
        jar.store("example.com", "session=abc; SameSite=Lax");
        assert!(jar.cookie_for("example.com", "POST", Some("other.com")).is_none());
        assert!(jar.cookie_for("example.com", "POST", Some("example.com")).is_some());
    }

    #[test]
    fn get_requests_always_send_the_cookie() {
        let mut jar = CookieJar::new();
        jar.store("example.com", "session=abc; SameSite=Lax");
        assert!(jar.cookie_for("example.com", "GET", Some("other.com")).is_some());
    }

    #[test]
    fn unknown_host_has_no_cookie() {
        let jar = CookieJar::new();
        assert!(jar.cookie_for("example.com", "GET", None).is_none());
    }
}
