pub mod envelope;
pub mod models;
pub mod pii;

pub use envelope::{ApiResponse, Pagination, PageRequest};
pub use pii::Masked;
