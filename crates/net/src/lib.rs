//! URL collaborator (spec.md §6): HTTP(S)/file fetch, resolve, origin,
//! a process-wide cookie jar, and a `max-age` response cache.

pub mod cache;
pub mod client;
pub mod cookie_jar;

pub use cache::ResponseCache;
pub use client::{Headers, ReqwestUrlClient, UrlClient};
pub use cookie_jar::CookieJar;
