pub mod auth;
pub mod boards;
pub mod error;
pub mod middleware;
pub mod reactions;
pub mod tenants;
