//! Disposal contract for container-managed services.

/// Cleanup hook invoked when the owning resolver is disposed.
///
/// Implement this for services that hold resources the container should
/// release at scope teardown. Tracked instances are disposed in reverse
/// construction order, exactly once; transients are never tracked.
///
/// # Examples
///
/// ```rust
/// use crucible_di::Dispose;
///
/// struct Connection {
///     name: String,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         // close sockets, flush buffers, ...
///     }
/// }
/// ```
pub trait Dispose: Send + Sync {
    /// Releases resources held by this service.
    fn dispose(&self);
}
