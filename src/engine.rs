use std::collections::HashMap;

use crate::types::{Trade, UserAggregate};

/// Reduce a flat trade sequence into per-user volume and count
/// statistics.
///
/// Trades without a resolvable user id are skipped; unparseable
/// amounts contribute zero volume but still count as a trade. Pure
/// fold: identical input yields identical output.
pub fn aggregate_trades(trades: &[Trade]) -> HashMap<u64, UserAggregate> {
    let mut aggregates: HashMap<u64, UserAggregate> = HashMap::new();

    for trade in trades {
        let Some(user_id) = trade.resolved_user_id() else {
            continue;
        };
        let agg = aggregates
            .entry(user_id)
            .or_insert_with(|| UserAggregate::new(user_id));
        agg.total_volume += trade.amount();
        agg.trade_count += 1;
    }

    aggregates
}

/// Sort aggregates into display order and truncate to the top `limit`.
///
/// Primary key is `total_volume` descending; ties break on lower
/// `user_id` first so the ordering is deterministic regardless of map
/// iteration order. Ranks are the 1-based positions in the returned
/// sequence.
pub fn rank_aggregates(aggregates: &HashMap<u64, UserAggregate>, limit: usize) -> Vec<UserAggregate> {
    let mut ranked: Vec<UserAggregate> = aggregates.values().cloned().collect();
    ranked.sort_by(|a, b| {
        b.total_volume
            .cmp(&a.total_volume)
            .then(a.user_id.cmp(&b.user_id))
    });
    ranked.truncate(limit);
    ranked
}
