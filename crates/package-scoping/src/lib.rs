//! Scoping rule engine for configurable service packages.
//!
//! A package advertises a base price and delivery timeline; buyers answer a
//! short questionnaire and admin-authored rules move the quote from there. The
//! [`scoping`] module holds the engine, the administration service that
//! maintains factors and rules, and the HTTP router exposing both.

pub mod config;
pub mod error;
pub mod scoping;
pub mod telemetry;
