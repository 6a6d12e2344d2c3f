pub mod http;

pub use http::{ApiError, ErrorResponse, router, serve};
