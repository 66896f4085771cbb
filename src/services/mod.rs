pub mod rate_limiter;
pub mod visit_recorder;
pub mod visit_stats;
