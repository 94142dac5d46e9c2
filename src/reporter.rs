use crate::types::Leaderboard;

/// Emit the leaderboard as pretty-printed JSON to stdout.
pub fn report_json(board: &Leaderboard) {
    if let Ok(json) = serde_json::to_string_pretty(board) {
        println!("{json}");
    }
}

/// Emit each entry as a single JSON line to stdout.
pub fn report_json_lines(board: &Leaderboard) {
    for entry in &board.entries {
        if let Ok(json) = serde_json::to_string(entry) {
            println!("{json}");
        }
    }
}

/// Emit a readable table to stdout. Logging stays on stderr.
pub fn report_table(board: &Leaderboard) {
    if board.entries.is_empty() {
        println!("No leaderboard data for the {} timeframe.", board.timeframe.label());
        return;
    }

    println!(
        "{} leaderboard — {} entr{} (generated {}{})",
        board.timeframe.label(),
        board.entries.len(),
        if board.entries.len() == 1 { "y" } else { "ies" },
        board.generated_at.to_rfc3339(),
        if board.complete { "" } else { ", partial data" },
    );
    println!(
        "{:>4}  {:<20} {:>14} {:>8} {:>12} {:>8} {:>7}",
        "rank", "username", "volume", "trades", "points", "win%", "streak"
    );
    for e in &board.entries {
        println!(
            "{:>4}  {:<20} {:>14} {:>8} {:>12} {:>7.1}% {:>7}",
            e.rank,
            e.username,
            e.total_volume,
            e.trade_count,
            e.total_points,
            e.win_rate * 100.0,
            e.current_streak,
        );
    }
}
