//! Service modules

pub mod geo;
pub mod matrix;
pub mod optimize_processor;
pub mod optimizer;
pub mod solver;
