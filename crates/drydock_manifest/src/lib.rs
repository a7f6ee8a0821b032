//! DRYDOCK Task Manifest
//!
//! Immutable description of what a run executes: global flags, auxiliary
//! library paths, and an ordered task list. Parsed once per run from a JSON
//! document whose schema has drifted across revisions; the loader normalizes
//! the known variants into one model with explicit, documented defaults.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod model;
pub mod schema;

pub use model::{EngineKind, Task, TaskManifest};
pub use schema::{load_manifest, ManifestError, AUX_LIBRARY_SUFFIX};
