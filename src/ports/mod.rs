pub mod player;
pub mod pricing;
pub mod store;
