pub mod audit;
pub mod http;

pub use http::VisServer;
