use std::future::Future;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Normalized server response shapes.
///
/// The backend answers list endpoints with a pagination envelope
/// `{results, next}`, a bare JSON array, or occasionally a single
/// object. All shape-sniffing happens here, at the fetcher boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum PagePayload {
    Paginated {
        results: Vec<Value>,
        next: Option<String>,
    },
    List(Vec<Value>),
    Single(Value),
}

impl PagePayload {
    /// Whether the server signaled a further page.
    pub fn has_next(&self) -> bool {
        matches!(self, Self::Paginated { next: Some(_), .. })
    }

    pub fn next_url(&self) -> Option<&str> {
        match self {
            Self::Paginated { next, .. } => next.as_deref(),
            _ => None,
        }
    }

    /// Items carried by this payload, in server order.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Paginated { results, .. } => results,
            Self::List(items) => items,
            Self::Single(item) => vec![item],
        }
    }
}

/// Normalize a raw JSON body into a `PagePayload`.
pub fn normalize_payload(body: Value) -> PagePayload {
    match body {
        Value::Array(items) => PagePayload::List(items),
        Value::Object(mut map) => {
            if let Some(Value::Array(results)) = map.remove("results") {
                let next = match map.remove("next") {
                    Some(Value::String(s)) if !s.is_empty() => Some(s),
                    _ => None,
                };
                PagePayload::Paginated { results, next }
            } else {
                PagePayload::Single(Value::Object(map))
            }
        }
        other => PagePayload::Single(other),
    }
}

/// Extract the continuation token from a `next` URL's `cursor` query
/// parameter (cursor-paginated endpoints, e.g. the analytics feeds).
pub fn extract_cursor(next_url: &str) -> Option<String> {
    let url = Url::parse(next_url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "cursor")
        .map(|(_, v)| v.into_owned())
}

/// Ceilings forcing a paginated walk to terminate even against a
/// misbehaving backend. Hitting one truncates the walk, it never fails.
#[derive(Debug, Clone, Copy)]
pub struct WalkLimits {
    pub max_pages: u32,
    pub max_items: Option<usize>,
}

impl WalkLimits {
    pub fn pages(max_pages: u32) -> Self {
        Self {
            max_pages,
            max_items: None,
        }
    }

    pub fn with_item_cap(max_pages: u32, max_items: usize) -> Self {
        Self {
            max_pages,
            max_items: Some(max_items),
        }
    }
}

/// Result of a paginated walk. `complete` is false when the walk was
/// truncated by a failed page or a ceiling; the gathered items are
/// still returned.
#[derive(Debug, Clone)]
pub struct FetchOutcome<T> {
    pub items: Vec<T>,
    pub complete: bool,
}

/// Walk a page-numbered endpoint until exhaustion, accumulating every
/// item in server order. Pages are requested sequentially starting at
/// page 1; page N+1 is not requested until page N has answered.
///
/// A failed page halts the walk and returns what has been gathered so
/// far — already-fetched pages are never discarded.
pub async fn fetch_all_pages<F, Fut>(mut fetch_page: F, limits: WalkLimits) -> FetchOutcome<Value>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PagePayload>>,
{
    let mut items: Vec<Value> = Vec::new();
    let mut page: u32 = 1;

    loop {
        let payload = match fetch_page(page).await {
            Ok(p) => p,
            Err(e) => {
                warn!("Page {page} fetch failed: {e:#} — returning {} gathered item(s)", items.len());
                return FetchOutcome {
                    items,
                    complete: false,
                };
            }
        };

        let has_next = payload.has_next();
        items.extend(payload.into_items());

        if let Some(cap) = limits.max_items {
            if items.len() >= cap {
                let truncated = items.len() > cap;
                items.truncate(cap);
                if truncated || has_next {
                    warn!("Item cap {cap} reached on page {page}, stopping walk");
                }
                return FetchOutcome {
                    items,
                    complete: !has_next && !truncated,
                };
            }
        }

        if !has_next {
            debug!("Pagination exhausted after {page} page(s), {} item(s)", items.len());
            return FetchOutcome {
                items,
                complete: true,
            };
        }

        if page >= limits.max_pages {
            warn!("Page ceiling {} reached, stopping walk", limits.max_pages);
            return FetchOutcome {
                items,
                complete: false,
            };
        }
        page += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::cell::Cell;

    // ── normalization ──────────────────────────────────────────────

    #[test]
    fn normalize_envelope() {
        let p = normalize_payload(json!({
            "results": [{"id": 1}, {"id": 2}],
            "next": "http://x/trades/?page=2"
        }));
        assert!(p.has_next());
        assert_eq!(p.into_items().len(), 2);
    }

    #[test]
    fn normalize_envelope_null_next() {
        let p = normalize_payload(json!({ "results": [{"id": 1}], "next": null }));
        assert!(!p.has_next());
        assert_eq!(p.into_items().len(), 1);
    }

    #[test]
    fn normalize_bare_array() {
        let p = normalize_payload(json!([{"id": 1}, {"id": 2}, {"id": 3}]));
        assert!(!p.has_next());
        assert_eq!(p.into_items().len(), 3);
    }

    #[test]
    fn normalize_single_object() {
        let p = normalize_payload(json!({ "id": 7, "username": "bob" }));
        assert!(!p.has_next());
        let items = p.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], 7);
    }

    // ── cursor extraction ──────────────────────────────────────────

    #[test]
    fn cursor_from_next_url() {
        let next = "http://localhost:8000/api/analytics/weekly/?cursor=cD0yMDI0";
        assert_eq!(extract_cursor(next), Some("cD0yMDI0".to_string()));
    }

    #[test]
    fn cursor_missing_param() {
        assert_eq!(extract_cursor("http://x/analytics/weekly/?page=2"), None);
        assert_eq!(extract_cursor("not a url"), None);
    }

    // ── walk ───────────────────────────────────────────────────────

    /// K pages of S items each, last page without a next link.
    fn make_pages(k: usize, s: usize) -> Vec<PagePayload> {
        (0..k)
            .map(|p| PagePayload::Paginated {
                results: (0..s).map(|i| json!({"id": p * s + i})).collect(),
                next: if p + 1 < k {
                    Some(format!("http://x/?page={}", p + 2))
                } else {
                    None
                },
            })
            .collect()
    }

    #[tokio::test]
    async fn walk_exact_pages_and_requests() {
        let pages = make_pages(4, 3);
        let calls = Cell::new(0u32);
        let outcome = fetch_all_pages(
            |page| {
                calls.set(calls.get() + 1);
                let payload = Ok(pages[(page - 1) as usize].clone());
                async move { payload }
            },
            WalkLimits::pages(1000),
        )
        .await;
        assert_eq!(calls.get(), 4);
        assert_eq!(outcome.items.len(), 12);
        assert!(outcome.complete);
        // Server order preserved
        assert_eq!(outcome.items[0]["id"], 0);
        assert_eq!(outcome.items[11]["id"], 11);
    }

    #[tokio::test]
    async fn walk_partial_on_midway_failure() {
        let pages = make_pages(5, 2);
        let outcome = fetch_all_pages(
            |page| {
                let payload = if page == 3 {
                    Err(anyhow!("boom"))
                } else {
                    Ok(pages[(page - 1) as usize].clone())
                };
                async move { payload }
            },
            WalkLimits::pages(1000),
        )
        .await;
        // Pages 1-2 only, failure does not discard them
        assert_eq!(outcome.items.len(), 4);
        assert!(!outcome.complete);
    }

    #[tokio::test]
    async fn walk_first_page_failure_yields_empty() {
        let outcome = fetch_all_pages(
            |_page| async { Err(anyhow!("connection refused")) },
            WalkLimits::pages(1000),
        )
        .await;
        assert!(outcome.items.is_empty());
        assert!(!outcome.complete);
    }

    #[tokio::test]
    async fn walk_page_ceiling_forces_termination() {
        // Backend that always claims a next page
        let calls = Cell::new(0u32);
        let outcome = fetch_all_pages(
            |page| {
                calls.set(calls.get() + 1);
                let payload = Ok(PagePayload::Paginated {
                    results: vec![json!({"id": page})],
                    next: Some("http://x/?page=more".to_string()),
                });
                async move { payload }
            },
            WalkLimits::pages(5),
        )
        .await;
        assert_eq!(calls.get(), 5);
        assert_eq!(outcome.items.len(), 5);
        assert!(!outcome.complete);
    }

    #[tokio::test]
    async fn walk_item_cap_truncates() {
        let outcome = fetch_all_pages(
            |page| {
                let payload = Ok(PagePayload::Paginated {
                    results: (0..4).map(|i| json!({"id": i})).collect(),
                    next: Some(format!("http://x/?page={}", page + 1)),
                });
                async move { payload }
            },
            WalkLimits::with_item_cap(100, 10),
        )
        .await;
        assert_eq!(outcome.items.len(), 10);
        assert!(!outcome.complete);
    }

    #[tokio::test]
    async fn walk_bare_array_single_request() {
        let calls = Cell::new(0u32);
        let outcome = fetch_all_pages(
            |_page| {
                calls.set(calls.get() + 1);
                let payload = Ok(PagePayload::List(vec![json!({"id": 1}), json!({"id": 2})]));
                async move { payload }
            },
            WalkLimits::pages(1000),
        )
        .await;
        assert_eq!(calls.get(), 1);
        assert_eq!(outcome.items.len(), 2);
        assert!(outcome.complete);
    }
}
