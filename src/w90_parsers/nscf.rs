use std::path::Path;

use log::info;
use ndarray::Array2;

use crate::{
    error::ConvertError,
    types::Result,
    w90_parsers::{
        read_to_string,
        Tokens,
    },
};


const END_OF_BANDS: &str = "End of band structure calculation";
const OCCUPATIONS: &str = "occupation numbers";


/// Occupations of the bands inside the projection window, parsed from the Quantum ESPRESSO
/// output `<seed>.nscf.out`.
#[derive(Debug, Clone, PartialEq)]
pub struct FermiWeights {
    /// shape = (nkpts, nbands)
    pub weights:     Array2<f64>,
    /// shape = (nkpts, 2), 0-based half-open band range [n_ks - nbands, n_ks)
    pub band_window: Array2<usize>,
}


impl FermiWeights {
    /// `n_ks` is the number of Kohn-Sham bands printed for each k-point, the window keeps the
    /// topmost `nbands` of them.
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized), nkpts: usize, n_ks: usize, nbands: usize) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading occupations from {:?} ...", path);
        let txt = read_to_string(path)?;
        Self::from_txt(&txt, &path.display().to_string(), nkpts, n_ks, nbands)
    }

    pub fn from_txt(txt: &str, fname: &str, nkpts: usize, n_ks: usize, nbands: usize) -> Result<Self> {
        if nbands > n_ks {
            return Err(ConvertError::InconsistentDimensions(
                    format!("{} bands in the window but only {} Kohn-Sham bands per k-point", nbands, n_ks)));
        }

        let start = txt.find(END_OF_BANDS)
            .ok_or_else(|| ConvertError::malformed(fname, format!("cannot find {:?}", END_OF_BANDS)))?;
        let mut rest = &txt[start ..];

        let mut weights = Array2::<f64>::zeros((nkpts, nbands));
        let mut band_window = Array2::<usize>::zeros((nkpts, 2));

        for ik in 0 .. nkpts {
            let pos = rest.find(OCCUPATIONS)
                .ok_or_else(|| ConvertError::malformed(fname,
                        format!("occupation numbers of k-point {} not found", ik + 1)))?;
            rest = &rest[pos + OCCUPATIONS.len() ..];

            let mut tokens = Tokens::new(fname, rest);
            let occs = (0 .. n_ks)
                .map(|_| tokens.next_parse::<f64>("occupation number"))
                .collect::<Result<Vec<f64>>>()?;

            band_window[(ik, 0)] = n_ks - nbands;
            band_window[(ik, 1)] = n_ks;
            for (ib, occ) in occs[n_ks - nbands ..].iter().enumerate() {
                weights[(ik, ib)] = *occ;
            }
        }

        Ok(Self {
            weights,
            band_window,
        })
    }
}
