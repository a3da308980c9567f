pub mod bipoly;
pub mod unipoly;
pub mod zeroin;

pub use bipoly::{Axis, BiPoly};
pub use unipoly::UniPoly;
pub use zeroin::{zeroin, PolyError};
