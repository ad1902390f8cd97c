/// Path overlays drawn on the scene's primary layer

pub mod path;
pub mod slots;

pub use path::{build_path, classify, grid_distance, Band, LineVertex, PathOverlay, PathSegment};
pub use slots::{OverlayChannel, OverlayHandle, OverlaySlots};
