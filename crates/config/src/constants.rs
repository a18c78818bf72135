//! Documented defaults for every recognized environment key (§6.3).

pub const DEFAULT_BATCH_SIZE: usize = 25;
pub const DEFAULT_MAX_CANDIDATES: usize = 60;
pub const DEFAULT_SMALL_PASS_TOP_K: usize = 12;
pub const DEFAULT_LARGE_PASS_TOP_K: usize = 6;
pub const DEFAULT_GRAPH_HOPS: usize = 2;
pub const DEFAULT_COOLDOWN_DAYS: i64 = 30;
pub const DEFAULT_RELIABILITY_WEIGHT: f64 = 1.0;
pub const DEFAULT_MIN_AVAILABILITY_MINUTES: u32 = 120;
pub const DEFAULT_MATCH_DOMAINS: &str = "general";
pub const DEFAULT_AUTO_SCHEDULE: bool = false;
pub const DEFAULT_REQUIRE_SAME_CITY: bool = true;
pub const DEFAULT_REQUIRE_SHARED_INTERESTS: bool = true;
pub const DEFAULT_MAX_TICKS: u32 = 6;
pub const DEFAULT_CRON_MAX_MS: u64 = 240_000;
pub const DEFAULT_LOCK_MS_SLACK: u64 = 60_000;
pub const DEFAULT_PRIORITY_WINDOW_HOURS: u32 = 24;
pub const DEFAULT_PROCESS_FEEDBACK_LIMIT: usize = 50;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
