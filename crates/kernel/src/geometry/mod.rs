pub mod area;
pub mod curves;
pub mod items;
pub mod point;
pub mod transform;

pub use area::{enclosing_area, Area};
pub use curves::{Crossing, Polyline};
pub use items::{ItemKey, ItemSet};
pub use point::{Bounds, Point2};
pub use transform::{reproject, MapProjection, Projection, Xform};
