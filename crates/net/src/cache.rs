//! Response cache keyed by URL, honoring `Cache-Control: max-age`
//! (spec.md §6). Grounded on `original_source/network.py`'s
//! `CACHE`/`get_maxage` pair.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    headers: HashMap<String, String>,
    body: Vec<u8>,
    stored_at: Instant,
    max_age: Duration,
}

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, Entry>,
}

impl ResponseCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<(HashMap<String, String>, Vec<u8>)> {
        let entry = self.entries.get(url)?;
        if entry.stored_at.elapsed() < entry.max_age {
            Some((entry.headers.clone(), entry.body.clone()))
        } else {
            None
        }
    }

    pub fn store(&mut self, url: &str, headers: HashMap<String, String>, body: Vec<u8>) {
        let max_age = max_age(&headers);
        if max_age.is_zero() {
            return;
        }
        self.entries.insert(url.to_owned(), Entry { headers, body, stored_at: Instant::now(), max_age });
    }
}

/// Parses `max-age=N` out of `Cache-Control`; absent or unparsable
/// yields zero (no caching), matching `original_source/network.py`'s
/// `get_maxage` defaulting to 0.
fn max_age(headers: &HashMap<String, String>) -> Duration {
    let Some(cache_control) = headers.get("cache-control") else {
        return Duration::ZERO;
    };
    cache_control
        .split(',')
        .filter_map(|part| part.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse::<u64>().ok())
        .map_or(Duration::ZERO, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn stores_and_returns_within_max_age() {
        let mut cache = ResponseCache::new();
        cache.store("http://x/", headers(&[("cache-control", "max-age=60")]), b"body".to_vec());
        assert!(cache.get("http://x/").is_some());
    }

    #[test]
    fn response_without_cache_control_is_not_cached() {
        let mut cache = ResponseCache::new();
        cache.store("http://x/", headers(&[]), b"body".to_vec());
        assert!(cache.get("http://x/").is_none());
    }

    #[test]
    fn zero_max_age_is_not_cached() {
        let mut cache = ResponseCache::new();
        cache.store("http://x/", headers(&[("cache-control", "max-age=0")]), b"body".to_vec());
        assert!(cache.get("http://x/").is_none());
    }
}
