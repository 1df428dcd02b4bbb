pub mod analysis;
pub mod common;
pub mod request;
pub mod route;
