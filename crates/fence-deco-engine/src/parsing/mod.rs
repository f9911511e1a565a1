//! # Fence Parsing
//!
//! Text-level knowledge about fenced code blocks, shared by the reading
//! surface and the live editor.
//!
//! ## Modules
//!
//! - **`kinds`**: Delimiter knowledge (`CodeFence`, `BlockQuote`)
//! - **`fence_state`**: `FenceTracker`, the line automaton every scanner uses
//! - **`params`**: Fence-line directives into `FenceParameters`
//! - **`normalize`**: Canonical code text for structural comparison
//! - **`rope`**: Line iteration with byte spans
//!
//! ## Key Invariants
//!
//! - Parsing is total: malformed input degrades to defaults, never errors
//! - Quote prefixes are stripped before any fence detection
//! - A block opened inside a quote ends with the quote run
//! - Fenced content is a raw zone: nothing inside is reinterpreted

pub mod fence_state;
pub mod kinds;
pub mod normalize;
pub mod params;
pub mod rope;

pub use fence_state::{FenceLine, FenceTracker, LineStep};
pub use kinds::{BlockQuote, CodeFence, FenceKind, FenceOpen, FenceSig};
pub use normalize::{normalize, normalize_loose, signature};
pub use params::{FenceParameters, LineNumbers, parse_fence_parameters};
