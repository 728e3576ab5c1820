// Application layer - use cases grouped by concern
// Orchestrates domain logic through ports implemented by infrastructure

pub mod ports;
pub mod captcha;
pub mod session;
pub mod reports;
