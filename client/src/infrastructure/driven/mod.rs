// Driven adapters - the back office over HTTP and the local filesystem

pub mod download;
pub mod http_transport;
pub mod session_guard;

pub use http_transport::ReqwestTransport;
pub use session_guard::LoginRedirectGuard;
