//! Pricing, trip-shadow-costing, and dispatch-matching core for a
//! chauffeured-vehicle platform.
//!
//! Arithmetic and geometry are pure; the only I/O boundaries are the
//! repository/provider traits in [`repository`], which callers implement
//! against their own storage (an in-memory reference implementation lives in
//! [`testkit`]).

pub mod commission;
pub mod corridor;
pub mod cost;
pub mod error;
pub mod geo;
pub mod grid;
#[cfg(feature = "http-providers")]
pub mod http_providers;
pub mod invoice;
pub mod model;
pub mod money;
pub mod override_price;
pub mod pricing;
pub mod quote;
pub mod rates;
pub mod repository;
pub mod rules;
pub mod segment;
pub mod subcontract;
pub mod testkit;
pub mod zone;
