//! Per-patch contouring: specs, boundary root lists, the tracker and the
//! geometry it produces.

pub mod ilist;
pub mod items;
pub mod patch_contour;
pub mod spec;
pub mod tracker;

pub use ilist::{find_roots, BoundaryRoot, IntersectionList, PatchEdges, PatchSide, RootKind};
pub use items::{ContourFragment, ExtremumKind, ExtremumMark, VectorBarb};
pub use patch_contour::{contour_patch, patch_vectors, reset_patch_styles};
pub use spec::{ContourSpec, LineStyle, MarkStyle, BarbStyle, SpecKind, SpecStyle};
pub use tracker::{circle_step, square_step, tidy_fragments, track_from_side, track_loop, StepOutcome};
