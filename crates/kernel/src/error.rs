use thiserror::Error;

/// Errors raised by spline and surface operations given bad input.
///
/// Topological trouble during contouring is not reported here; it is
/// logged and carried as a `failed` flag on the result instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("Spline needs at least 4 control vertices per axis, got {m}x{n}")]
    InvalidGrid { m: usize, n: usize },

    #[error("Grid length must be positive, got {gridlen}")]
    InvalidGridLength { gridlen: f64 },

    #[error("Control array has {got} values, expected {expected}")]
    ControlArrayMismatch { expected: usize, got: usize },

    #[error("Control vertex ({iu}, {iv}) outside {m}x{n} grid")]
    VertexOutOfRange { iu: usize, iv: usize, m: usize, n: usize },

    #[error("Patch ({iu}, {iv}) outside {nu}x{nv} patch grid")]
    PatchOutOfRange { iu: usize, iv: usize, nu: usize, nv: usize },

    #[error("Patch edge ({iu}, {iv}) outside {rows}x{cols} edge grid")]
    EdgeOutOfRange { iu: usize, iv: usize, rows: usize, cols: usize },

    #[error("Band lower bound {lower} is not below upper bound {upper}")]
    InvalidBand { lower: f64, upper: f64 },

    #[error("Operation needs a vector field")]
    NotVector,

    #[error("Operation needs a scalar field")]
    NotScalar,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}
