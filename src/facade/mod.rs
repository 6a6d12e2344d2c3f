pub mod messages;
pub mod service;

pub use messages::*;
pub use service::SphynxService;
