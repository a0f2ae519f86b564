/// Router Module Index
///
/// Splits the application's routes by how they are protected, so that access control is
/// applied at the module level (via Axum layers) and never forgotten on a single route.

/// Routes accessible to anyone: health, the login landing page, and the guard preview.
pub mod public;

/// JSON routes that resolve the caller through the `CurrentIdentity` extractor.
pub mod api;

/// One route per declared page, all behind the page guard middleware.
pub mod pages;
