// Application ports - Driven ports (output ports implemented by infrastructure)

pub mod http_transport;
pub mod session_guard;

pub use http_transport::HttpTransport;
pub use session_guard::SessionGuard;

#[cfg(test)]
pub use http_transport::MockHttpTransport;
