pub mod agent;
pub mod session;
pub mod streaming;
pub mod tooling;
