pub mod conclusion;
pub mod current_yield;
pub mod duration;
pub mod fair_value;
pub mod metrics;
pub mod schedule;
pub mod snapshot;
pub mod ytm;
