//! URL handling module for skein
//!
//! Raw links (possibly relative or scheme-less) are promoted to absolute
//! URLs here, and discovered links pass through the admission filter that
//! decides what enters the frontier.

mod admission;
mod normalize;

pub use admission::AdmissionFilter;
pub use normalize::{promote, SUPPORTED_SCHEMES};
