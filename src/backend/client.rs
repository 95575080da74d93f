mod core;
pub mod defects;
pub mod insights;

pub use self::core::BackendClient;
pub use defects::DefectFilter;
