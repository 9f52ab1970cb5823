//! Bundle data model for Vega's precise code-intelligence indexes.
//!
//! A [`Bundle`] holds one commit's complete index: per-file [`Document`]s
//! (source ranges linked to definition/reference/hover results) plus the
//! sharded result-location tables those links resolve through. The
//! `vega-merge` crate combines a base bundle with a freshly indexed patch
//! bundle into the index for a new commit.

mod bundle;
mod ids;

pub use bundle::*;
pub use ids::*;
