//! Quest Engine — one-minute micro-quest recommendations.
//!
//! Picks a short self-regulation action for a user from their personality
//! profile, situation and mood, either by asking a generative model for a
//! novel quest or by instantiating a template from a curated catalog.

pub mod core;
pub mod schema;
