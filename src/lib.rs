pub mod api;
pub mod client;
pub mod config;
pub mod engine;
pub mod pagination;
pub mod pipeline;
pub mod reporter;
pub mod types;

/// Default backend REST API base URL (local development server).
pub const API_BASE: &str = "http://localhost:8000/api";

/// Leaderboard size shown by the platform frontend.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 50;
