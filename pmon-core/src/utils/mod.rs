pub mod backoff;
pub mod position_diff;
