//! Probe: user profile endpoint
//!
//! Hits GET {base}/users/{id}/ and documents the profile fields the
//! enricher depends on (username, total_points, win_rate, streak,
//! wallet_address) plus 404 behavior for an unknown id.

use anyhow::Result;
use prediction_leaderboard::API_BASE;
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<()> {
    let base = std::env::var("LEADERBOARD_API_BASE").unwrap_or_else(|_| API_BASE.to_string());
    let user_id: u64 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "1".to_string())
        .parse()?;
    let client = reqwest::Client::new();

    println!("=== Probe: user profile endpoint ===");
    println!();

    // 1. Known user
    let url = format!("{}/users/{user_id}/", base.trim_end_matches('/'));
    println!("--- 1. GET {url} ---");
    let resp = client.get(&url).send().await?;
    println!("Status: {}", resp.status());
    if resp.status().is_success() {
        let body: Value = resp.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        if let Some(obj) = body.as_object() {
            println!("\nEnrichment fields:");
            for field in [
                "username",
                "total_points",
                "win_rate",
                "streak",
                "current_streak",
                "wallet_address",
            ] {
                println!("  has '{field}': {}", obj.contains_key(field));
            }
        }
    }
    println!();

    // 2. Unknown user — confirm a clean 404 (enricher maps this to a
    // placeholder entry)
    let url = format!("{}/users/999999999/", base.trim_end_matches('/'));
    println!("--- 2. GET {url} ---");
    let resp = client.get(&url).send().await?;
    println!("Status: {}", resp.status());
    println!();

    println!("=== Probe complete ===");
    Ok(())
}
