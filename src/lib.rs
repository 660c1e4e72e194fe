// opmap - an operation-map driven HTTP client runtime for Rust
//
// A generated (or hand-written) registry of dotted operation keys is turned
// into a nested client whose leaves encode parameters, call a pluggable
// transport, and resolve the response status against declared codes.

// Re-export core functionality
pub use opmap_client::*;

// Re-export optional crates
#[cfg(feature = "log")]
pub use opmap_log;

// Prelude for common imports
pub mod prelude {
    pub use opmap_client::prelude::*;

    #[cfg(feature = "log")]
    pub use opmap_log::init as init_logging;
}
