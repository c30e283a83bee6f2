//! Integration tests for kube-spawn configuration resolution and persistence

mod config_integration;
mod resolve_scenarios;
mod store_round_trip;
mod test_utils;
mod validation_integration;
