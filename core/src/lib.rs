//! Ad campaign simulation engine.
//!
//! A session walks home → genre-selection → acquisition → retention →
//! monetization → results. `engine::CampaignEngine` owns the session; the
//! formula, variance, market-event and feedback layers are pure functions
//! it calls with injected randomness.

pub mod achievements;
pub mod advisor;
pub mod aggregator;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod feedback;
pub mod formulas;
pub mod genre;
pub mod market_events;
pub mod preview;
pub mod rng;
pub mod state;
pub mod store;
pub mod strategy;
pub mod types;
pub mod variance;
