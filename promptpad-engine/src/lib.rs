pub mod engine;
pub mod manager;
pub mod session;
pub mod traits;
