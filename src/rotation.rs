//! Local-to-global rotation matrices of the correlated shells, derived from H(R = 0).

use std::{
    fmt,
    str::FromStr,
};

use clap::ValueEnum;
use log::{
    info,
    debug,
};
use ndarray::{
    Array1,
    Array2,
    ArrayView2,
    s,
};
use serde::{
    Serialize,
    Deserialize,
};

use crate::{
    diagnostics::{
        Checked,
        DiagnosticKind,
        Diagnostics,
    },
    error::ConvertError,
    linalg::{
        allclose,
        dagger,
        eigh,
        identity,
        is_unitary,
        max_abs_diff,
    },
    shells::{
        CorrelatedShell,
        ShellEquivalence,
        total_dim,
    },
    types::c64,
};


/// How the rotation matrices are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum RotationPolicy {
    /// Identity matrices. Physically wrong, only meant for testing when the other methods fail.
    #[serde(rename = "none")]
    #[value(name = "none")]
    None,

    /// Eigenvectors diagonalizing each shell's block of H(0).
    #[serde(rename = "hloc_diag", alias = "diagonalizing")]
    #[value(name = "hloc_diag", alias = "diagonalizing")]
    HlocDiag,

    /// Eigenvectors of the shell times the adjoint eigenvectors of its representative, i.e. the
    /// representative's frame is the global frame of reference.
    #[serde(rename = "wannier", alias = "combined")]
    #[value(name = "wannier", alias = "combined")]
    Wannier,
}

impl FromStr for RotationPolicy {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none"                       => Ok(Self::None),
            "hloc_diag" | "diagonalizing" => Ok(Self::HlocDiag),
            "wannier" | "combined"        => Ok(Self::Wannier),
            _ => Err(ConvertError::UnsupportedConfiguration(
                    format!("Parameter rot_mat_type invalid, should be one of \"hloc_diag\", \"wannier\", \"none\", got {:?}", s))),
        }
    }
}

impl fmt::Display for RotationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None     => "none",
            Self::HlocDiag => "hloc_diag",
            Self::Wannier  => "wannier",
        };
        f.write_str(name)
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct Rotations {
    /// False if any consistency check failed, the matrices are then not trustworthy.
    pub succeeded: bool,
    pub rot_mat:   Vec<Array2<c64>>,
}


/// Find the rotation matrices bringing each correlated shell from the global to its local frame.
///
/// `ham0` is H(R = 0) restricted to the correlated orbitals, shells appearing contiguously in
/// the order of `shells`. All checks run to completion and each failure is reported.
pub fn solve(shells: &[CorrelatedShell],
             equivalence: &ShellEquivalence,
             ham0: &ArrayView2<c64>,
             policy: RotationPolicy,
             tolerance: f64) -> Checked<Rotations> {
    let mut diagnostics = Diagnostics::new();
    let mut rot_mat = shells.iter()
        .map(|sh| identity(sh.dim))
        .collect::<Vec<_>>();
    let shells_map = equivalence.shells_map();

    let (nrow, ncol) = ham0.dim();
    if nrow != ncol || nrow != total_dim(shells) {
        diagnostics.error(DiagnosticKind::WrongBlockStructure,
            format!("wrong block structure of input Hamiltonian: {}x{} for {} correlated orbitals",
                    nrow, ncol, total_dim(shells)));
        return Checked::new(Rotations { succeeded: false, rot_mat }, diagnostics);
    }

    if policy == RotationPolicy::None {
        diagnostics.warn(DiagnosticKind::UnphysicalRotation,
            "using the method \"none\" leads to physically wrong results. Only use for testing if other methods fail.");
        return Checked::new(Rotations { succeeded: true, rot_mat }, diagnostics);
    }

    let mut blocks: Vec<Array2<c64>> = Vec::with_capacity(shells.len());
    let mut eigvals: Vec<Array1<f64>> = Vec::with_capacity(shells.len());
    let mut eigvecs: Vec<Array2<c64>> = Vec::with_capacity(shells.len());
    let mut iwf = 0;
    for (ish, sh) in shells.iter().enumerate() {
        let block = ham0.slice(s![iwf .. iwf + sh.dim, iwf .. iwf + sh.dim]).to_owned();
        let (vals, vecs) = eigh(&block.view());
        debug!("Eigenvalues of H(0) for shell {}: {}", ish, vals);

        // The diagonalizing frame is ill-defined for degenerate levels.
        if equivalence.class_size(ish) > 1 &&
            vals.iter().zip(vals.iter().skip(1)).any(|(a, b)| (b - a).abs() < tolerance) {
            diagnostics.warn(DiagnosticKind::DegenerateEigenvalues,
                format!("degenerate eigenvalue of H(0) detected for shell {}: global-to-local transformation might not work!", ish));
        }

        blocks.push(block);
        eigvals.push(vals);
        eigvecs.push(vecs);
        iwf += sh.dim;
    }

    let mut succeeded = true;
    for ish in 0 .. shells.len() {
        let irep = shells_map[ish];

        rot_mat[ish] = match policy {
            RotationPolicy::HlocDiag => eigvecs[ish].clone(),
            RotationPolicy::Wannier  => {
                if eigvecs[ish].dim() == eigvecs[irep].dim() {
                    eigvecs[ish].dot(&dagger(&eigvecs[irep].view()))
                } else {
                    diagnostics.error(DiagnosticKind::WrongMapping,
                        format!("Global-to-local rotation matrix cannot be constructed for shell {}", ish));
                    succeeded = false;
                    continue;
                }
            },
            RotationPolicy::None => unreachable!("handled above"),
        };

        // equivalent shells must share their on-site levels
        let same_levels = eigvals[ish].len() == eigvals[irep].len() &&
            eigvals[ish].iter().zip(eigvals[irep].iter()).all(|(a, b)| (a - b).abs() <= tolerance);
        if !same_levels {
            let diff = if eigvals[ish].len() == eigvals[irep].len() {
                format!("{}", &eigvals[ish] - &eigvals[irep])
            } else {
                "different shell dimensions".to_string()
            };
            diagnostics.error(DiagnosticKind::EigenvalueMismatch,
                format!("eigenvalue mismatch between equivalent shells {} and {}, difference: {}", ish, irep, diff));
            succeeded = false;
        }

        if !is_unitary(&rot_mat[ish].view(), tolerance) {
            diagnostics.error(DiagnosticKind::NonUnitaryRotation,
                format!("rot_mat for shell {} is not unitary!", ish));
            succeeded = false;
        }

        // the representative shell is the global frame of reference
        let tmat = match policy {
            RotationPolicy::Wannier => rot_mat[ish].clone(),
            _ => rot_mat[ish].dot(&dagger(&rot_mat[irep].view())),
        };
        let mapped = dagger(&tmat.view()).dot(&blocks[ish]).dot(&tmat);
        if !allclose(&mapped.view(), &blocks[irep].view(), tolerance) {
            let dev = if mapped.dim() == blocks[irep].dim() {
                format!("{:.3e}", max_abs_diff(&mapped.view(), &blocks[irep].view()))
            } else {
                "shape mismatch".to_string()
            };
            diagnostics.error(DiagnosticKind::WrongMapping,
                format!("rot_mat does not map H(0) of shell {} onto shell {} correctly (max deviation {})", ish, irep, dev));
            succeeded = false;
        }
    }

    info!("Rotation matrices ({}) {}", policy, if succeeded { "constructed" } else { "FAILED the consistency checks" });
    Checked::new(Rotations { succeeded, rot_mat }, diagnostics)
}
