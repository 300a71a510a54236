pub mod client;
pub mod env;

pub use client::ClientConfig;
pub use env::EnvConfig;
