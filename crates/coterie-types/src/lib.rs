//! Shared types for the coterie marketplace: domain models, status
//! machines, API request/response shapes, and domain events.

pub mod api;
pub mod events;
pub mod models;
