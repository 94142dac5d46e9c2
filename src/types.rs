use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Leaderboard timeframe selector.
///
/// `AllTime` is computed client-side from raw trades; `Weekly` and
/// `Monthly` come pre-aggregated from the analytics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Timeframe {
    AllTime,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AllTime => "all-time",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// A single trade as returned by `GET /trades/`.
///
/// The backend is not consistent about field names or numeric encoding:
/// the owning user arrives as `user` or `user_id`, the stake as
/// `amount_staked` or `amount`, and amounts may be JSON numbers or
/// decimal strings. Raw values are kept as `serde_json::Value` and
/// resolved through the accessors below.
#[derive(Debug, Clone, Deserialize)]
pub struct Trade {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, alias = "user")]
    pub user_id: Option<Value>,
    #[serde(default, alias = "amount")]
    pub amount_staked: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "market")]
    pub market_id: Option<u64>,
    #[serde(default)]
    pub outcome_type: Option<String>,
}

impl Trade {
    /// Resolved owning user id, if the record carries one.
    pub fn resolved_user_id(&self) -> Option<u64> {
        parse_user_id(self.user_id.as_ref()?)
    }

    /// Stake amount; unparseable or missing values coerce to zero.
    pub fn amount(&self) -> Decimal {
        self.amount_staked
            .as_ref()
            .map(parse_decimal)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Parse a user id that may be a JSON number or a numeric string.
pub fn parse_user_id(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a money-like value that may be a JSON number or a decimal
/// string. Failures coerce to zero rather than erroring.
pub fn parse_decimal(v: &Value) -> Decimal {
    match v {
        Value::Number(n) => n.to_string().parse().unwrap_or(Decimal::ZERO),
        Value::String(s) => s.trim().parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// Per-user statistics accumulated over one pass of the trade set.
/// Built fresh per pipeline run and discarded after ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAggregate {
    pub user_id: u64,
    pub total_volume: Decimal,
    pub trade_count: u64,
}

impl UserAggregate {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            total_volume: Decimal::ZERO,
            trade_count: 0,
        }
    }
}

/// User profile as returned by `GET /users/{id}/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub total_points: Decimal,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default, alias = "streak")]
    pub current_streak: i64,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// One row of the pre-aggregated weekly/monthly analytics leaderboard.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsRow {
    #[serde(alias = "user")]
    pub user_id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub total_points: Decimal,
    #[serde(default)]
    pub total_volume: Decimal,
    #[serde(default)]
    pub trade_count: u64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default, alias = "streak")]
    pub current_streak: i64,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// Final display-ready leaderboard row. Immutable once built; exists
/// only for the duration of a single run.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position after the final sort.
    pub rank: u32,
    pub user_id: u64,
    pub username: String,
    pub total_volume: Decimal,
    pub trade_count: u64,
    pub total_points: Decimal,
    pub win_rate: f64,
    pub current_streak: i64,
    pub wallet_address: Option<String>,
}

impl LeaderboardEntry {
    /// Placeholder entry for a ranked user whose profile lookup failed.
    /// The rank slot is preserved; enrichment fields are zeroed.
    pub fn placeholder(rank: u32, agg: &UserAggregate) -> Self {
        Self {
            rank,
            user_id: agg.user_id,
            username: format!("User {}", agg.user_id),
            total_volume: agg.total_volume,
            trade_count: agg.trade_count,
            total_points: Decimal::ZERO,
            win_rate: 0.0,
            current_streak: 0,
            wallet_address: None,
        }
    }

    pub fn from_profile(rank: u32, agg: &UserAggregate, profile: &UserProfile) -> Self {
        Self {
            rank,
            user_id: agg.user_id,
            username: if profile.username.is_empty() {
                format!("User {}", agg.user_id)
            } else {
                profile.username.clone()
            },
            total_volume: agg.total_volume,
            trade_count: agg.trade_count,
            total_points: profile.total_points,
            win_rate: profile.win_rate,
            current_streak: profile.current_streak,
            wallet_address: profile.wallet_address.clone(),
        }
    }

    pub fn from_analytics(rank: u32, row: &AnalyticsRow) -> Self {
        Self {
            rank,
            user_id: row.user_id,
            username: if row.username.is_empty() {
                format!("User {}", row.user_id)
            } else {
                row.username.clone()
            },
            total_volume: row.total_volume,
            trade_count: row.trade_count,
            total_points: row.total_points,
            win_rate: row.win_rate,
            current_streak: row.current_streak,
            wallet_address: row.wallet_address.clone(),
        }
    }
}

/// Result of one pipeline run.
///
/// `complete` is false when pagination halted early (failed page or
/// safety ceiling) or the run was cancelled — the entry list is still
/// valid, just best-effort. An empty, complete leaderboard means the
/// backend genuinely has no trades.
#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub timeframe: Timeframe,
    pub generated_at: DateTime<Utc>,
    pub complete: bool,
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn empty(timeframe: Timeframe, complete: bool) -> Self {
        Self {
            timeframe,
            generated_at: Utc::now(),
            complete,
            entries: Vec::new(),
        }
    }
}
