// Driven port - reaction to an expired session

use crate::domain::RequestDescriptor;

pub trait SessionGuard: Send + Sync {
    /// Called once per 401 response, before the error reaches the caller
    fn on_unauthorized(&self, request: &RequestDescriptor);
}
