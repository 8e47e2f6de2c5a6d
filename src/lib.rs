//! Nutri Assist — nutrition-assistant chat backend.

pub mod config;
pub mod dialogue;
pub mod engine;
pub mod error;
pub mod generator;
pub mod goals;
pub mod intent;
pub mod milestones;
pub mod profile;
pub mod routes;
pub mod store;
pub mod vision;
pub mod weight;
