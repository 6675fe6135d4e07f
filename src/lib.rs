//! Planting wizard — guided onboarding of a planting area.

pub mod config;
pub mod error;
pub mod store;
pub mod wizard;
