/// Camera permission states reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Authorized,
}

/// Platform camera-permission gate.
pub trait AuthorizationProvider: Send + Sync {
    fn status(&self) -> AuthorizationStatus;

    /// Ask the user for access. `response` fires asynchronously with the
    /// decision; it may fire on a platform-owned thread.
    fn request_access(&self, response: Box<dyn FnOnce(bool) + Send + 'static>);
}
