//! Core trigger logic (transport-agnostic)
//!
//! This module MUST NOT depend on `platform`: everything here works against
//! the [`NasSession`] trait so it can run against the mock session in tests.

pub mod catalog;
pub mod dispatch;
pub mod session;
pub mod validation;

// Test utilities for mock sessions (tests only)
#[cfg(test)]
pub mod mock_session;

pub use catalog::{ConfigQuery, DiscoverPlan, FanOut, TestCatalog, TestDefinition};
pub use dispatch::{
    AdvertisedApi, DiscoveryReport, Dispatcher, ProbeOutcome, RunSummary, CUSTOM_TEST_NAME,
};
pub use session::{
    describe_api_error, ApiCall, ApiResponse, NasSession, ShellOutput, TriggerResult,
};
pub use validation::{default_port, resolve_target, validate_host};
