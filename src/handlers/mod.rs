mod api;
mod health;

pub use api::{index, slow};
pub use health::{health_check, readiness_check, stats};
