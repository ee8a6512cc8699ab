//! Headless collaborators for tests, demos and replay.
//!
//! Every type here implements one of the seams in [`crate::traits`] without
//! a platform behind it. Handles are cheap to clone and share state, so a
//! caller can keep one after handing another to the engine.

mod asset;
mod location;
mod surface;
mod viewport;

pub use asset::{LoadCounter, StaticAssetLoader};
pub use location::{SimulatedLocationProvider, WalkPath};
pub use surface::{RecordingSurface, ToggleProjection};
pub use viewport::HeadlessViewport;
