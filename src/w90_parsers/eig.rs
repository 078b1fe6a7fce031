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


/// Read Kohn-Sham eigenvalues from `<seed>.eig`, lines of `iband ikpt energy` with the band
/// index running fastest.
///
/// shape(ret) = (nkpts, nbands)
pub fn read_eig(path: &(impl AsRef<Path> + ?Sized), nkpts: usize, nbands: usize) -> Result<Array2<f64>> {
    let path = path.as_ref();
    info!("reading {:20}(required for entangled bands)", path.display().to_string());
    let txt = read_to_string(path)?;
    parse_eig(&txt, &path.display().to_string(), nkpts, nbands)
}


pub fn parse_eig(txt: &str, fname: &str, nkpts: usize, nbands: usize) -> Result<Array2<f64>> {
    let mut tokens = Tokens::new(fname, txt);
    let mut eigs = Array2::<f64>::zeros((nkpts, nbands));

    for ik in 0 .. nkpts {
        for ib in 0 .. nbands {
            let iband = tokens.next_parse::<usize>("band index")?;
            let ikpt  = tokens.next_parse::<usize>("k-point index")?;
            if iband != ib + 1 || ikpt != ik + 1 {
                return Err(ConvertError::malformed(fname,
                        format!("expected band {} of k-point {}, found band {} of k-point {}",
                                ib + 1, ik + 1, iband, ikpt)));
            }
            eigs[(ik, ib)] = tokens.next_parse::<f64>("eigenvalue")?;
        }
    }

    Ok(eigs)
}
