use std::path::Path;

use log::info;
use ndarray::{
    Array2,
    Array3,
};

use crate::{
    error::ConvertError,
    types::{
        c64,
        Result,
    },
    w90_parsers::{
        read_to_string,
        Tokens,
    },
};


/// Which unitary-matrix file is parsed, they only differ in the block shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UMatKind {
    /// `<seed>_u.mat`, header `n_k n_wf n_wf`, blocks of n_wf x n_wf
    Unitary,
    /// `<seed>_u_dis.mat`, header `n_k n_wf n_bands`, blocks of n_bands x n_wf
    Disentanglement,
}


/// Per k-point complex matrices of `_u.mat` or `_u_dis.mat`.
#[derive(Debug, Clone)]
pub struct UMatrices {
    pub kind:      UMatKind,
    pub num_wf:    usize,
    pub num_bands: usize,
    /// shape = (nkpts, 3), fractional coordinates as written by Wannier90
    pub kpts:      Array2<f64>,
    /// shape = (nkpts, nrow, ncol), nrow = num_wf (Unitary) or num_bands (Disentanglement)
    pub mats:      Array3<c64>,
}

impl UMatrices {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized), kind: UMatKind) -> Result<Self> {
        let path = path.as_ref();
        let txt = read_to_string(path)?;
        Self::from_txt(&txt, &path.display().to_string(), kind)
    }

    pub fn from_txt(txt: &str, fname: &str, kind: UMatKind) -> Result<Self> {
        let mut lines = txt.lines();
        let header = lines.next()
            .ok_or_else(|| ConvertError::malformed(fname, "empty file"))?
            .trim();
        info!("reading {:20}...{}", fname, header);

        let dims = lines.next()
            .ok_or_else(|| ConvertError::malformed(fname, "missing dimension line"))?;
        let mut tokens = Tokens::new(fname, dims);
        let nkpts  = tokens.next_parse::<usize>("number of k-points")?;
        let num_wf = tokens.next_parse::<usize>("number of Wannier functions")?;
        let third  = tokens.next_parse::<usize>("number of bands")?;

        let (nrow, ncol, num_bands) = match kind {
            UMatKind::Unitary => {
                if third != num_wf {
                    return Err(ConvertError::malformed(fname,
                            format!("U matrices must be square, got {} x {}", num_wf, third)));
                }
                (num_wf, num_wf, num_wf)
            },
            UMatKind::Disentanglement => (third, num_wf, third),
        };

        let body = lines.collect::<Vec<&str>>().join("\n");
        let mut tokens = Tokens::new(fname, &body);
        let mut kpts = Array2::<f64>::zeros((nkpts, 3));
        let mut mats = Array3::<c64>::zeros((nkpts, nrow, ncol));

        for ik in 0 .. nkpts {
            for idir in 0 .. 3 {
                kpts[(ik, idir)] = tokens.next_parse::<f64>("k-point coordinate")?;
            }
            // column-major, as written by Fortran
            for icol in 0 .. ncol {
                for irow in 0 .. nrow {
                    let re = tokens.next_parse::<f64>("matrix element")?;
                    let im = tokens.next_parse::<f64>("matrix element")?;
                    mats[(ik, irow, icol)] = c64::new(re, im);
                }
            }
        }

        Ok(Self {
            kind,
            num_wf,
            num_bands,
            kpts,
            mats,
        })
    }

    pub fn nkpts(&self) -> usize {
        self.kpts.nrows()
    }
}
