use num::complex::Complex;

use crate::error::ConvertError;

#[allow(non_camel_case_types)]
pub type c64 = Complex<f64>;

pub type Result<T> = std::result::Result<T, ConvertError>;

pub type MatX3<T> = Vec<[T;3]>;  // Nx3 matrix

/// Matrix elements below this threshold are considered equal.
///
/// Wannier90 writes `_hr.dat` with six decimal digits, so nothing tighter is meaningful.
pub const W90_ZERO: f64 = 2.0e-6;


/// Spin channel of a collinear calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spin {
    Up,
    Down,
}

impl Spin {
    /// Suffix appended to the seed name by Wannier90 for spin-polarized runs.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Up   => "_up",
            Self::Down => "_down",
        }
    }
}
