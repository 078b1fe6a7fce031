use std::{
    path::Path,
    sync::OnceLock,
};

use log::info;
use regex::Regex;

use crate::{
    error::ConvertError,
    shells::CorrelatedShell,
    types::Result,
    w90_parsers::{
        read_to_string,
        Tokens,
    },
};


/// Contents of `<seed>.inp`, the converter's own parameter file.
///
/// Layout (free format, Fortran `D` exponents allowed):
/// ```text
/// kmesh_mode [nk1 nk2 nk3]      # sizes only when kmesh_mode >= 0
/// density_required
/// n_corr_shells
/// atom sort l dim SO irep       # one line per correlated shell
/// [fermi_energy]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct W90Input {
    pub kmesh_mode:       i64,
    pub kmesh_size:       Option<[usize; 3]>,
    pub density_required: f64,
    pub corr_shells:      Vec<CorrelatedShell>,
    pub fermi_energy:     f64,
}

impl W90Input {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading input from {:?} ...", path);
        let txt = read_to_string(path)?;
        Self::from_txt(&txt, &path.display().to_string())
    }

    pub fn from_txt(txt: &str, fname: &str) -> Result<Self> {
        let txt = Self::replace_fortran_exponent(txt);
        let mut tokens = Tokens::new(fname, &txt);

        let kmesh_mode = next_int(&mut tokens, fname, "k-mesh mode")?;
        let kmesh_size = if kmesh_mode >= 0 {
            let mut size = [0usize; 3];
            for (idir, n) in size.iter_mut().enumerate() {
                *n = next_usize(&mut tokens, fname, &format!("k-mesh size along axis {}", idir + 1))?;
            }
            Some(size)
        } else {
            None
        };

        let density_required = tokens.next_parse::<f64>("number of electrons")?;
        let n_corr_shells = next_usize(&mut tokens, fname, "number of correlated shells")?;

        let mut corr_shells = Vec::with_capacity(n_corr_shells);
        for icrsh in 0 .. n_corr_shells {
            let what = format!("correlated shell {}", icrsh);
            let mut v = [0usize; 6];
            for x in v.iter_mut() {
                *x = next_usize(&mut tokens, fname, &what)?;
            }
            let [atom, sort, l, dim, so, irep] = v;
            corr_shells.push(CorrelatedShell { atom, sort, l, dim, so, irep });
        }

        // The Fermi energy is optional and defaults to zero.
        let fermi_energy = tokens.next_parse_opt::<f64>("Fermi energy")?.unwrap_or(0.0);

        Ok(Self {
            kmesh_mode,
            kmesh_size,
            density_required,
            corr_shells,
            fermi_energy,
        })
    }

    fn replace_fortran_exponent(txt: &str) -> String {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        PATTERN.get_or_init(|| Regex::new(r"([0-9.])[dD]([-+]?[0-9])").unwrap())
            .replace_all(txt, "${1}E${2}")
            .into_owned()
    }
}


/// Integer tokens may be written as reals, e.g. `2.0`.
fn next_int(tokens: &mut Tokens, fname: &str, what: &str) -> Result<i64> {
    let x = tokens.next_parse::<f64>(what)?;
    if x.fract() != 0.0 {
        return Err(ConvertError::malformed(fname, format!("{} must be an integer, got {}", what, x)));
    }
    Ok(x as i64)
}

fn next_usize(tokens: &mut Tokens, fname: &str, what: &str) -> Result<usize> {
    let x = next_int(tokens, fname, what)?;
    usize::try_from(x)
        .map_err(|_| ConvertError::malformed(fname, format!("{} must not be negative, got {}", what, x)))
}
