pub mod batch;
pub mod dataset;
pub mod health;
pub mod predict;
