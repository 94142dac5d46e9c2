use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::api::{self, TradeFilter};
use crate::client::ApiClient;
use crate::config::SettingsConfig;
use crate::engine::{aggregate_trades, rank_aggregates};
use crate::types::{Leaderboard, LeaderboardEntry, Timeframe, UserAggregate, UserProfile};

/// Cooperative cancellation handle passed into each pipeline run.
///
/// Cloning shares the flag. The pipeline checks it between stages and
/// stops issuing work once set; callers that superseded a run use it to
/// make sure stale results are never committed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Enrich ranked aggregates with user profiles, preserving rank order.
///
/// All lookups are issued concurrently and collected together. A failed
/// lookup degrades that one entry to a placeholder; it never disturbs
/// the others and is not retried.
pub async fn enrich<F, Fut>(ranked: &[UserAggregate], mut lookup: F) -> Vec<LeaderboardEntry>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<UserProfile>>,
{
    let lookups: Vec<Fut> = ranked.iter().map(|agg| lookup(agg.user_id)).collect();
    let profiles = join_all(lookups).await;

    ranked
        .iter()
        .zip(profiles)
        .enumerate()
        .map(|(i, (agg, result))| {
            let rank = (i + 1) as u32;
            match result {
                Ok(profile) => LeaderboardEntry::from_profile(rank, agg, &profile),
                Err(e) => {
                    warn!("Profile lookup failed for user {}: {e:#}", agg.user_id);
                    LeaderboardEntry::placeholder(rank, agg)
                }
            }
        })
        .collect()
}

/// Run the full one-shot leaderboard pipeline for a timeframe.
///
/// All-time: fetch every trade → aggregate per user → rank and
/// truncate → enrich with profiles. Weekly/monthly: consume the
/// backend's pre-aggregated analytics feed directly.
///
/// Never errors. A total failure (nothing fetched) yields an empty
/// leaderboard with `complete = false`; callers must treat empty as a
/// valid outcome.
pub async fn build_leaderboard(
    client: &ApiClient,
    settings: &SettingsConfig,
    timeframe: Timeframe,
    filter: &TradeFilter,
    cancel: &CancelToken,
) -> Leaderboard {
    match timeframe {
        Timeframe::AllTime => build_all_time(client, settings, filter, cancel).await,
        Timeframe::Weekly | Timeframe::Monthly => {
            build_from_analytics(client, settings, timeframe, cancel).await
        }
    }
}

async fn build_all_time(
    client: &ApiClient,
    settings: &SettingsConfig,
    filter: &TradeFilter,
    cancel: &CancelToken,
) -> Leaderboard {
    let fetched = api::fetch_all_trades(client, settings, filter).await;
    if cancel.is_cancelled() {
        debug!("Run superseded after trade fetch, discarding");
        return Leaderboard::empty(Timeframe::AllTime, false);
    }
    info!(
        "Aggregating {} trade(s) (complete: {})",
        fetched.items.len(),
        fetched.complete,
    );

    let aggregates = aggregate_trades(&fetched.items);
    let ranked = rank_aggregates(&aggregates, settings.leaderboard_size);
    if cancel.is_cancelled() {
        debug!("Run superseded after ranking, discarding");
        return Leaderboard::empty(Timeframe::AllTime, false);
    }

    let entries = enrich(&ranked, |user_id| api::fetch_user(client, user_id)).await;
    if cancel.is_cancelled() {
        debug!("Run superseded after enrichment, discarding");
        return Leaderboard::empty(Timeframe::AllTime, false);
    }

    Leaderboard {
        timeframe: Timeframe::AllTime,
        generated_at: Utc::now(),
        complete: fetched.complete,
        entries,
    }
}

async fn build_from_analytics(
    client: &ApiClient,
    settings: &SettingsConfig,
    timeframe: Timeframe,
    cancel: &CancelToken,
) -> Leaderboard {
    let fetched = api::fetch_analytics(client, settings, timeframe).await;
    if cancel.is_cancelled() {
        debug!("Run superseded after analytics fetch, discarding");
        return Leaderboard::empty(timeframe, false);
    }

    let entries: Vec<LeaderboardEntry> = fetched
        .items
        .iter()
        .take(settings.leaderboard_size)
        .enumerate()
        .map(|(i, row)| LeaderboardEntry::from_analytics((i + 1) as u32, row))
        .collect();

    Leaderboard {
        timeframe,
        generated_at: Utc::now(),
        complete: fetched.complete,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::types::Trade;

    fn agg(user_id: u64, volume: Decimal, count: u64) -> UserAggregate {
        UserAggregate {
            user_id,
            total_volume: volume,
            trade_count: count,
        }
    }

    fn profile(name: &str, points: Decimal) -> UserProfile {
        UserProfile {
            username: name.to_string(),
            total_points: points,
            win_rate: 0.5,
            current_streak: 2,
            wallet_address: None,
        }
    }

    // ── enrich ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn enrich_assigns_sequential_ranks() {
        let ranked = vec![agg(2, dec!(20), 1), agg(1, dec!(15), 2)];
        let entries = enrich(&ranked, |id| {
            let p = profile(&format!("user-{id}"), dec!(10));
            async move { Ok(p) }
        })
        .await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].user_id, 2);
        assert_eq!(entries[0].username, "user-2");
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[1].user_id, 1);
    }

    #[tokio::test]
    async fn enrich_failed_lookup_becomes_placeholder() {
        let ranked = vec![agg(2, dec!(20), 1), agg(1, dec!(15), 2), agg(3, dec!(5), 1)];
        let entries = enrich(&ranked, |id| async move {
            if id == 1 {
                Err(anyhow!("404"))
            } else {
                Ok(profile(&format!("user-{id}"), dec!(7)))
            }
        })
        .await;
        // Failed lookup keeps its sorted rank slot with zeroed fields
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[1].username, "User 1");
        assert_eq!(entries[1].total_points, Decimal::ZERO);
        assert_eq!(entries[1].total_volume, dec!(15));
        // Neighbors unaffected
        assert_eq!(entries[0].username, "user-2");
        assert_eq!(entries[2].username, "user-3");
    }

    #[tokio::test]
    async fn enrich_empty_input() {
        let entries = enrich(&[], |_| async { Ok(UserProfile::default()) }).await;
        assert!(entries.is_empty());
    }

    // ── pipeline stages composed offline ───────────────────────────

    fn mock_trades() -> Vec<Trade> {
        vec![
            json!({"id": 1, "user": 1, "amount_staked": "10"}),
            json!({"id": 2, "user": 1, "amount_staked": "5"}),
            json!({"id": 3, "user": 2, "amount_staked": "20"}),
            json!({"id": 4, "amount_staked": "99"}),
        ]
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect()
    }

    async fn run_stages(trades: &[Trade], limit: usize) -> Vec<LeaderboardEntry> {
        let aggregates = aggregate_trades(trades);
        let ranked = rank_aggregates(&aggregates, limit);
        enrich(&ranked, |id| {
            let p = profile(&format!("user-{id}"), dec!(1));
            async move { Ok(p) }
        })
        .await
    }

    #[tokio::test]
    async fn stages_produce_expected_ranking() {
        let entries = run_stages(&mock_trades(), 2).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_id, 2);
        assert_eq!(entries[0].total_volume, dec!(20));
        assert_eq!(entries[1].user_id, 1);
        assert_eq!(entries[1].total_volume, dec!(15));
        assert_eq!(entries[1].trade_count, 2);
    }

    #[tokio::test]
    async fn stages_idempotent_on_fixed_input() {
        let trades = mock_trades();
        let first = run_stages(&trades, 50).await;
        let second = run_stages(&trades, 50).await;
        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b);
    }

    // ── cancellation ───────────────────────────────────────────────

    #[test]
    fn cancel_token_shares_flag_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
