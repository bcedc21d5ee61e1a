//! Read access to application state the middleware consults.

use farmd_wire::Service;

/// Connectivity flags and cache hints owned by the surrounding application.
///
/// Reducers outside this crate flip these; the router and the ping loops
/// only ever read them.
pub trait StateView: Send + Sync {
    /// Whether `service` has reported in since the last connect.
    fn service_connected(&self, service: Service) -> bool;

    /// Whether a plot list is already cached.
    fn has_plots(&self) -> bool {
        false
    }

    /// Whether plot directories are already cached.
    fn has_plot_directories(&self) -> bool {
        false
    }
}
