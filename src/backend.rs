mod client;
mod core;
mod timestamps;
pub mod types;

pub use self::client::DefectFilter;
pub use self::core::{DefectSnapshot, DefectTracker};
