//! Small dense complex linear algebra helpers on top of ndarray.
//!
//! The Hermitian eigensolver is delegated to nalgebra, everything else stays in ndarray.

use nalgebra::DMatrix;
use ndarray::{
    Array1,
    Array2,
    ArrayView2,
};

use crate::types::c64;


/// Conjugate transpose.
pub fn dagger(a: &ArrayView2<c64>) -> Array2<c64> {
    a.t().mapv(|v| v.conj())
}


pub fn identity(n: usize) -> Array2<c64> {
    Array2::from_diag_elem(n, c64::new(1.0, 0.0))
}


/// Element-wise `|a - b| <= atol`, same as `numpy.allclose(a, b, atol=atol, rtol=0)`.
pub fn allclose(a: &ArrayView2<c64>, b: &ArrayView2<c64>, atol: f64) -> bool {
    a.shape() == b.shape() &&
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).norm() <= atol)
}


pub fn max_abs_diff(a: &ArrayView2<c64>, b: &ArrayView2<c64>) -> f64 {
    a.iter().zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}


pub fn is_hermitian(a: &ArrayView2<c64>, atol: f64) -> bool {
    a.nrows() == a.ncols() && allclose(&dagger(a).view(), a, atol)
}


/// `a · a^† == I` within `atol`.
pub fn is_unitary(a: &ArrayView2<c64>, atol: f64) -> bool {
    a.nrows() == a.ncols() &&
        allclose(&a.dot(&dagger(a)).view(), &identity(a.nrows()).view(), atol)
}


/// Eigen decomposition of a Hermitian matrix.
///
/// Returns eigenvalues in ascending order, eigenvectors are the columns of the
/// second matrix in the same order. The caller guarantees `a` is square.
pub fn eigh(a: &ArrayView2<c64>) -> (Array1<f64>, Array2<c64>) {
    let n = a.nrows();
    if n == 0 {
        return (Array1::zeros(0), Array2::zeros((0, 0)));
    }

    let m = DMatrix::<c64>::from_fn(n, n, |i, j| a[(i, j)]);
    let eig = m.symmetric_eigen();

    let mut order = (0 .. n).collect::<Vec<usize>>();
    order.sort_by(|&i, &j| eig.eigenvalues[i].total_cmp(&eig.eigenvalues[j]));

    let eigvals = order.iter()
        .map(|&i| eig.eigenvalues[i])
        .collect::<Array1<f64>>();
    let eigvecs = Array2::from_shape_fn((n, n), |(i, j)| eig.eigenvectors[(i, order[j])]);

    (eigvals, eigvecs)
}
