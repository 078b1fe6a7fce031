//! Projectors P(k) = <w_α,k|ψ_ν,k> from Kohn-Sham bands onto correlated local orbitals.

use log::info;
use ndarray::{
    Array3,
    Array5,
    ArrayView3,
    Axis,
    s,
};

use crate::{
    error::ConvertError,
    linalg::dagger,
    shells::{
        CorrelatedShell,
        max_dim,
        total_dim,
    },
    types::{
        c64,
        Result,
    },
};


/// U_total(k) = U_dis(k) · U(k)
///
/// shape(udis) = (nkpts, nbands, nwf), shape(u) = (nkpts, nwf, nwf), shape(ret) = (nkpts, nbands, nwf)
pub fn total_unitary(udis: &ArrayView3<c64>, u: &ArrayView3<c64>) -> Result<Array3<c64>> {
    let (nk_dis, nbands, nwf_dis) = udis.dim();
    let (nk_u, nwf_row, nwf) = u.dim();

    if nk_dis != nk_u || nwf_dis != nwf_row {
        return Err(ConvertError::InconsistentDimensions(
                format!("cannot combine U_dis of shape {:?} with U of shape {:?}", udis.shape(), u.shape())));
    }

    let mut ret = Array3::<c64>::zeros((nk_u, nbands, nwf));
    for (ik, mut r) in ret.axis_iter_mut(Axis(0)).enumerate() {
        r.assign(&udis.index_axis(Axis(0), ik).dot(&u.index_axis(Axis(0), ik)));
    }
    Ok(ret)
}


/// Assemble the projector tensor of shape (nkpts, nspin, n_corr_shells, max_dim, nbands).
///
/// `u_totals` holds one U_total per spin channel. Correlated orbitals are taken to be the first
/// Wannier functions, in the order of `shells`. Rows beyond a shell's dimension and bands beyond
/// a channel's band count stay zero.
pub fn build(shells: &[CorrelatedShell], u_totals: &[ArrayView3<c64>]) -> Result<Array5<c64>> {
    let nspin = u_totals.len();
    let nkpts = u_totals.first()
        .map(|u| u.shape()[0])
        .ok_or_else(|| ConvertError::InconsistentDimensions("no spin channel to build projectors from".to_string()))?;
    let nbands = u_totals.iter().map(|u| u.shape()[1]).max().unwrap_or(0);
    let dim_corr = total_dim(shells);

    for u in u_totals.iter() {
        if u.shape()[0] != nkpts {
            return Err(ConvertError::InconsistentDimensions(
                    format!("spin channels have {} and {} k-points", nkpts, u.shape()[0])));
        }
        if u.shape()[2] < dim_corr {
            return Err(ConvertError::InconsistentDimensions(
                    format!("{} Wannier functions cannot host {} correlated orbitals", u.shape()[2], dim_corr)));
        }
    }

    let mut proj_mat = Array5::<c64>::zeros((nkpts, nspin, shells.len(), max_dim(shells), nbands));

    for (isp, u) in u_totals.iter().enumerate() {
        let nb = u.shape()[1];
        for ik in 0 .. nkpts {
            let p = dagger(&u.index_axis(Axis(0), ik));  // (nwf, nb)
            let mut iorb = 0;
            for (ish, sh) in shells.iter().enumerate() {
                proj_mat.slice_mut(s![ik, isp, ish, 0 .. sh.dim, 0 .. nb])
                    .assign(&p.slice(s![iorb .. iorb + sh.dim, ..]));
                iorb += sh.dim;
            }
        }
    }

    info!("Projectors built for {} k-points, {} spin channel(s), {} correlated shell(s).", nkpts, nspin, shells.len());
    Ok(proj_mat)
}
