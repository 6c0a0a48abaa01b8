//! Outbound adapters (upstream rate provider).

mod navasan;

pub use navasan::{NavasanConfig, NavasanProvider};
