//! Test harness for fnserver server functions.
//!
//! [`FunctionTest`] builds the observed state and input of a single call from
//! typed values, JSON or YAML fixtures, runs one [`fnserver_core::ServerFunction`]
//! and diffs what it staged against the expected desired state.

pub mod error;
pub mod fixture;
pub mod harness;
pub mod outcome;

pub use error::FixtureError;
pub use fixture::ANNOTATION_KEY_RESOURCE_NAME;
pub use harness::FunctionTest;
pub use outcome::{Mismatch, TestOutcome};
