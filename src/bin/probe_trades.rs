//! Probe: trades endpoint
//!
//! Hits GET {base}/trades/ and documents:
//! - Response shape (pagination envelope vs bare array)
//! - Field names on a sample trade (user vs user_id, amount encoding)
//! - Pagination behavior (page/page_size, next link)

use anyhow::Result;
use prediction_leaderboard::API_BASE;
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<()> {
    let base = std::env::var("LEADERBOARD_API_BASE").unwrap_or_else(|_| API_BASE.to_string());
    let client = reqwest::Client::new();
    let url = format!("{}/trades/", base.trim_end_matches('/'));

    println!("=== Probe: trades endpoint ===");
    println!("URL: {url}");
    println!();

    // 1. Default request — what shape comes back?
    println!("--- 1. Default request ---");
    let resp = client.get(&url).send().await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await?;
    match &body {
        Value::Array(arr) => {
            println!("Shape: bare array ({} items)", arr.len());
        }
        Value::Object(obj) => {
            if obj.contains_key("results") {
                let count = obj["results"].as_array().map(|a| a.len()).unwrap_or(0);
                println!("Shape: pagination envelope ({count} results)");
                println!("next: {}", obj.get("next").unwrap_or(&Value::Null));
                if let Some(total) = obj.get("count") {
                    println!("count: {total}");
                }
            } else {
                println!("Shape: single object");
            }
        }
        other => println!("Shape: unexpected ({other})"),
    }
    println!();

    // 2. Sample trade fields
    println!("--- 2. Sample trade ---");
    let sample = match &body {
        Value::Array(arr) => arr.first(),
        Value::Object(obj) => obj.get("results").and_then(|r| r.as_array()).and_then(|a| a.first()),
        _ => None,
    };
    match sample {
        Some(trade) => {
            println!("{}", serde_json::to_string_pretty(trade)?);
            if let Some(obj) = trade.as_object() {
                println!("\nFields present:");
                for key in obj.keys() {
                    println!("  - {key}");
                }
                for field in ["user", "user_id", "amount", "amount_staked"] {
                    println!("  has '{field}': {}", obj.contains_key(field));
                }
            }
        }
        None => println!("No trades returned"),
    }
    println!();

    // 3. Explicit pagination params
    println!("--- 3. page=2, page_size=5 ---");
    let resp = client
        .get(&url)
        .query(&[("page", "2"), ("page_size", "5")])
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await?;
    let count = match &body {
        Value::Array(arr) => arr.len(),
        Value::Object(obj) => obj
            .get("results")
            .and_then(|r| r.as_array())
            .map(|a| a.len())
            .unwrap_or(0),
        _ => 0,
    };
    println!("Returned {count} trades");
    println!();

    println!("=== Probe complete ===");
    Ok(())
}
