pub mod catalog;
pub mod config;
pub mod engine;
pub mod gemini;
pub mod history;
pub mod ledger;
pub mod policy;
pub mod provider;
pub mod store;
pub mod template;
