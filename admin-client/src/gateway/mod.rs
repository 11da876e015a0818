pub mod backend;
pub mod http_client;
pub mod responses;

pub use backend::AdminBackend;
pub use http_client::HttpBackend;
pub use responses::{RegisterRequest, USER_EXISTS_DETAIL};
