pub mod error;
pub mod ids;
pub mod model;
pub mod recipe;

pub use error::AppError;
