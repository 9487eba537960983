pub mod compiled;
pub mod request;
