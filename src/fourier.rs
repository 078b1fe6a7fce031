//! Lattice Fourier synthesis H(R) -> H(k) and its inverse.
//!
//! The sums are direct and serial, O(nkpts * nrpt * nwf^2).

use std::f64::consts::PI;

use ndarray::{
    Array3,
    ArrayView3,
    Axis,
    s,
};

use crate::{
    kmesh::KMesh,
    linalg::dagger,
    types::c64,
    w90_parsers::hr::RVectorSet,
};


fn phase(mesh: &KMesh, ik: usize, r: &[i64; 3]) -> c64 {
    let k = mesh.kpts.row(ik);
    let rdotk = 2.0 * PI * (k[0] * r[0] as f64 + k[1] * r[1] as f64 + k[2] * r[2] as f64);
    c64::new(rdotk.cos(), rdotk.sin())
}


/// H(k) = Σ_R exp(2πi k·R) / deg(R) · H(R)
///
/// shape(hamr) = (nrpt, nwf, nwf), shape(ret) = (nkpts, nwf, nwf)
pub fn synthesize(hamr: &ArrayView3<c64>, rvectors: &RVectorSet, mesh: &KMesh) -> Array3<c64> {
    let nwf = hamr.shape()[1];
    let mut hamk = Array3::<c64>::zeros((mesh.nkpts(), nwf, nwf));

    for (ik, mut hk) in hamk.axis_iter_mut(Axis(0)).enumerate() {
        for (ir, (r, deg)) in rvectors.rvecs.iter().zip(rvectors.degeneracies.iter()).enumerate() {
            let factor = phase(mesh, ik, r) / *deg as f64;
            hk.scaled_add(factor, &hamr.index_axis(Axis(0), ir));
        }
    }

    hamk
}


/// H(R) = deg(R) / N_k · Σ_k exp(-2πi k·R) H(k)
///
/// Exact inverse of [`synthesize`] whenever the R vectors are distinct modulo the mesh.
pub fn inverse(hamk: &ArrayView3<c64>, rvectors: &RVectorSet, mesh: &KMesh) -> Array3<c64> {
    let nwf = hamk.shape()[1];
    let nkpts = mesh.nkpts() as f64;
    let mut hamr = Array3::<c64>::zeros((rvectors.len(), nwf, nwf));

    for (ir, mut hr) in hamr.axis_iter_mut(Axis(0)).enumerate() {
        let r = &rvectors.rvecs[ir];
        let deg = rvectors.degeneracies[ir] as f64;
        for ik in 0 .. mesh.nkpts() {
            let factor = phase(mesh, ik, r).conj() * deg / nkpts;
            hr.scaled_add(factor, &hamk.index_axis(Axis(0), ik));
        }
    }

    hamr
}


/// Express H(k) in the band basis, U(k) · H(k) · U(k)^†.
///
/// shape(u_total) = (nkpts, nbands, nwf); this is P^† H P with P = U^† the projector onto
/// all Wannier functions.
pub fn upfold(hamk: &ArrayView3<c64>, u_total: &ArrayView3<c64>) -> Array3<c64> {
    let (nkpts, nbands) = (u_total.shape()[0], u_total.shape()[1]);
    let mut ret = Array3::<c64>::zeros((nkpts, nbands, nbands));

    for ik in 0 .. nkpts {
        let u = u_total.slice(s![ik, .., ..]);
        let hk = hamk.slice(s![ik, .., ..]);
        ret.slice_mut(s![ik, .., ..]).assign(&u.dot(&hk).dot(&dagger(&u)));
    }

    ret
}
