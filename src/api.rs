use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::config::SettingsConfig;
use crate::pagination::{
    FetchOutcome, WalkLimits, extract_cursor, fetch_all_pages, normalize_payload,
};
use crate::types::{AnalyticsRow, Timeframe, Trade, UserProfile};

/// Optional server-side filters forwarded to `GET /trades/` as query
/// parameters. Filtering happens in the backend; the aggregator never
/// filters by date itself.
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub market_id: Option<u64>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl TradeFilter {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(market) = self.market_id {
            params.push(("market", market.to_string()));
        }
        if let Some(after) = self.created_after {
            params.push(("created_after", after.to_rfc3339()));
        }
        if let Some(before) = self.created_before {
            params.push(("created_before", before.to_rfc3339()));
        }
        params
    }
}

/// Deserialize raw page items, skipping rows that do not fit the
/// expected shape.
fn parse_items<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Skipping malformed {what} record: {e}");
                None
            }
        })
        .collect();
    if parsed.len() < total {
        warn!("Dropped {} malformed {what} record(s)", total - parsed.len());
    }
    parsed
}

/// Fetch every trade behind `GET /trades/` via the bulk paginated walk.
///
/// Uses the aggregation ceilings from settings (large pages, bounded
/// page and item counts). A failed page truncates the walk; gathered
/// trades are still returned with `complete = false`.
pub async fn fetch_all_trades(
    client: &ApiClient,
    settings: &SettingsConfig,
    filter: &TradeFilter,
) -> FetchOutcome<Trade> {
    let page_size = settings.trade_page_size;
    let limits = WalkLimits::with_item_cap(settings.trade_max_pages, settings.trade_max_items);

    let outcome = fetch_all_pages(
        |page| {
            let mut query = vec![
                ("page", page.to_string()),
                ("page_size", page_size.to_string()),
            ];
            query.extend(filter.query_params());
            async move {
                let body = client.get_json("trades/", &query).await?;
                Ok(normalize_payload(body))
            }
        },
        limits,
    )
    .await;

    let trades = parse_items(outcome.items, "trade");
    debug!("Fetched {} trade(s) (complete: {})", trades.len(), outcome.complete);
    FetchOutcome {
        items: trades,
        complete: outcome.complete,
    }
}

/// Fetch one user profile. 404 and network failures propagate; the
/// enricher converts them into placeholder entries.
pub async fn fetch_user(client: &ApiClient, user_id: u64) -> Result<UserProfile> {
    let body = client.get_json(&format!("users/{user_id}/"), &[]).await?;
    serde_json::from_value(body).with_context(|| format!("malformed profile for user {user_id}"))
}

/// Walk a cursor-paginated pre-aggregated analytics leaderboard
/// (`/analytics/weekly/` or `/analytics/monthly/`).
///
/// The continuation token is read from the `cursor` query parameter of
/// each page's `next` URL. Same tolerance as the trade walk: a failed
/// page truncates, it never errors.
pub async fn fetch_analytics(
    client: &ApiClient,
    settings: &SettingsConfig,
    timeframe: Timeframe,
) -> FetchOutcome<AnalyticsRow> {
    let path = match timeframe {
        Timeframe::Weekly => "analytics/weekly/",
        Timeframe::Monthly => "analytics/monthly/",
        Timeframe::AllTime => {
            warn!("No analytics endpoint for the all-time timeframe");
            return FetchOutcome {
                items: Vec::new(),
                complete: true,
            };
        }
    };

    let mut items: Vec<Value> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages: u32 = 0;
    let mut complete = true;

    loop {
        let query: Vec<(&str, String)> = cursor
            .as_ref()
            .map(|c| ("cursor", c.clone()))
            .into_iter()
            .collect();

        let body = match client.get_json(path, &query).await {
            Ok(b) => b,
            Err(e) => {
                warn!("Analytics page fetch failed: {e:#} — returning {} row(s)", items.len());
                complete = false;
                break;
            }
        };

        let payload = normalize_payload(body);
        let next = payload.next_url().map(str::to_string);
        items.extend(payload.into_items());
        pages += 1;

        match next.as_deref().and_then(extract_cursor) {
            Some(c) if pages < settings.max_pages => cursor = Some(c),
            Some(_) => {
                warn!("Page ceiling {} reached on {path}", settings.max_pages);
                complete = false;
                break;
            }
            None => break,
        }
    }

    let rows = parse_items(items, "analytics");
    debug!("Fetched {} analytics row(s) from {path}", rows.len());
    FetchOutcome {
        items: rows,
        complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_query_params() {
        let filter = TradeFilter {
            market_id: Some(12),
            created_after: None,
            created_before: None,
        };
        assert_eq!(filter.query_params(), vec![("market", "12".to_string())]);
        assert!(TradeFilter::default().query_params().is_empty());
    }

    #[test]
    fn parse_items_skips_malformed_rows() {
        let rows: Vec<AnalyticsRow> = parse_items(
            vec![
                json!({"user": 1, "username": "a", "total_points": "10"}),
                json!("not an object"),
                json!({"user_id": 2}),
            ],
            "analytics",
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, 1);
        assert_eq!(rows[1].user_id, 2);
    }
}
