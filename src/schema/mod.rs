pub mod mood;
pub mod profile;
pub mod quest;
