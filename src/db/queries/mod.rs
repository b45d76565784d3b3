//! Database query modules

pub mod batch;
pub mod fleet;
pub mod route;
