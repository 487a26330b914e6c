//! HTTP client for the collections platform's REST API.

use std::time::Duration;

use async_trait::async_trait;
use curator_core::{CollectionRecord, Item};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::SyncError;
use crate::platform::CollectionPlatform;

pub const DEFAULT_API_BASE: &str = "https://api.sketchfab.com/v3";

const MAX_ATTEMPTS: u32 = 5;
/// Upper bound on a server-requested `Retry-After` wait.
const MAX_RETRY_WAIT: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("curator/", env!("CARGO_PKG_VERSION"));

/// Token-authenticated client for the platform API.
///
/// Throttled and gateway-error responses are retried. Mutating calls are
/// spaced at least `min_post_interval` apart.
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    min_post_interval: Duration,
    last_post: Mutex<Option<Instant>>,
}

// ── Wire types ──

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

/// A like entry. Fields sit at the top level or under `model`.
#[derive(Deserialize, Default)]
struct LikeEntry {
    uid: Option<String>,
    name: Option<String>,
    description: Option<String>,
    tags: Option<Vec<TagRef>>,
    user: Option<UserRef>,
    model: Option<Box<LikeEntry>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagRef {
    Name(String),
    Object { name: String },
}

impl TagRef {
    fn into_name(self) -> String {
        match self {
            TagRef::Name(n) | TagRef::Object { name: n } => n,
        }
    }
}

#[derive(Deserialize)]
struct UserRef {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    username: Option<String>,
}

#[derive(Deserialize)]
struct CollectionEntry {
    uid: Option<String>,
    name: Option<String>,
    slug: Option<String>,
}

#[derive(Deserialize)]
struct MemberEntry {
    model: Option<ModelRef>,
}

#[derive(Deserialize)]
struct ModelRef {
    uid: Option<String>,
}

impl LikeEntry {
    /// Flatten into an item, preferring top-level fields.
    fn into_item(self) -> Option<Item> {
        let inner = self.model.map(|m| *m).unwrap_or_default();
        let uid = self.uid.or(inner.uid).filter(|u| !u.is_empty())?;
        let tags = self
            .tags
            .or(inner.tags)
            .unwrap_or_default()
            .into_iter()
            .map(TagRef::into_name)
            .collect();
        let author = self
            .user
            .or(inner.user)
            .and_then(|u| u.display_name.or(u.username))
            .unwrap_or_default();
        Some(Item {
            uid,
            name: self.name.or(inner.name).unwrap_or_default(),
            description: self.description.or(inner.description).unwrap_or_default(),
            tags,
            author,
            ..Default::default()
        })
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 502 | 503 | 504)
}

fn retry_delay(headers: &HeaderMap, attempt: u32) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::from_secs_f64(secs.min(MAX_RETRY_WAIT.as_secs_f64())))
        .unwrap_or_else(|| Duration::from_secs(1 + u64::from(attempt)))
}

/// Wait before the next attempt, or `None` once the attempts are used up.
fn retry_wait(headers: &HeaderMap, attempt: u32) -> Option<Duration> {
    (attempt + 1 < MAX_ATTEMPTS).then(|| retry_delay(headers, attempt))
}

impl PlatformClient {
    /// `base_url` like `https://api.sketchfab.com/v3` (trailing slash ignored).
    pub fn new(
        base_url: &str,
        token: &str,
        min_post_interval: Duration,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            min_post_interval,
            last_post: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Hold the post slot until the minimum interval since the last mutation has passed.
    async fn wait_for_post_slot(&self) -> tokio::sync::MutexGuard<'_, Option<Instant>> {
        let guard = self.last_post.lock().await;
        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.min_post_interval {
                tokio::time::sleep(self.min_post_interval - elapsed).await;
            }
        }
        guard
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, SyncError> {
        let url = self.url(path);
        let mutating = method != Method::GET;

        for attempt in 0..MAX_ATTEMPTS {
            let mut slot = if mutating {
                Some(self.wait_for_post_slot().await)
            } else {
                None
            };

            let mut req = self
                .client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, format!("Token {}", self.token))
                .header(ACCEPT, "application/json");
            if let Some(body) = body {
                req = req.json(body);
            }
            let sent = req.send().await;

            // Spacing counts from the end of the previous mutation, whatever its status.
            if let Some(slot) = slot.as_mut() {
                **slot = Some(Instant::now());
            }
            drop(slot);

            let resp = sent?;
            let status = resp.status();
            if is_retryable(status) {
                let Some(wait) = retry_wait(resp.headers(), attempt) else {
                    warn!(method = %method, url = %url, status = status.as_u16(), "throttled; giving up");
                    break;
                };
                warn!(
                    method = %method,
                    url = %url,
                    status = status.as_u16(),
                    wait_secs = wait.as_secs_f64(),
                    "throttled; retrying"
                );
                tokio::time::sleep(wait).await;
                continue;
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                error!(method = %method, url = %url, status = status.as_u16(), "request failed");
                return Err(SyncError::Server {
                    status: status.as_u16(),
                    body,
                });
            }
            return Ok(resp);
        }

        Err(SyncError::Throttled {
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Fetch every page starting at `path`, following `next` until it is null.
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, SyncError> {
        let mut out = Vec::new();
        let mut next = Some(path.to_string());
        let mut page = 0usize;

        while let Some(url) = next {
            let text = self.request(Method::GET, &url, None).await?.text().await?;
            let parsed: Page<T> = serde_json::from_str(&text)?;
            page += 1;
            debug!(page, count = parsed.results.len(), total = out.len() + parsed.results.len(), "fetched page");
            out.extend(parsed.results);
            next = parsed.next.filter(|n| !n.is_empty());
        }
        Ok(out)
    }
}

#[async_trait]
impl CollectionPlatform for PlatformClient {
    async fn liked_items(&self) -> Result<Vec<Item>, SyncError> {
        let entries: Vec<LikeEntry> = self.get_all("/me/likes").await?;
        let total = entries.len();
        let items: Vec<Item> = entries.into_iter().filter_map(LikeEntry::into_item).collect();
        if items.len() < total {
            warn!(skipped = total - items.len(), "like entries without uid skipped");
        }
        info!(count = items.len(), "pulled liked items");
        Ok(items)
    }

    async fn collections(&self) -> Result<Vec<CollectionRecord>, SyncError> {
        let entries: Vec<CollectionEntry> = self.get_all("/me/collections").await?;
        let collections = entries
            .into_iter()
            .filter_map(|c| {
                let uid = c.uid.filter(|u| !u.is_empty())?;
                Some(CollectionRecord {
                    uid,
                    name: c.name.unwrap_or_default(),
                    slug: c.slug,
                    members: Vec::new(),
                })
            })
            .collect();
        Ok(collections)
    }

    async fn collection_members(&self, collection_uid: &str) -> Result<Vec<String>, SyncError> {
        let entries: Vec<MemberEntry> = self
            .get_all(&format!("/collections/{collection_uid}/items"))
            .await?;
        Ok(entries
            .into_iter()
            .filter_map(|e| e.model.and_then(|m| m.uid))
            .filter(|u| !u.is_empty())
            .collect())
    }

    async fn add_item_to_collection(
        &self,
        collection_uid: &str,
        item_uid: &str,
    ) -> Result<(), SyncError> {
        let body = serde_json::json!({ "model": item_uid });
        self.request(
            Method::POST,
            &format!("/collections/{collection_uid}/items"),
            Some(&body),
        )
        .await?;
        debug!(collection = %collection_uid, item = %item_uid, "added item to collection");
        Ok(())
    }
}
