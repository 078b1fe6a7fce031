use std::path::Path;

use log::{
    info,
    debug,
};
use ndarray::{
    Array3,
    ArrayView2,
    Axis,
};

use crate::{
    diagnostics::{
        Checked,
        DiagnosticKind,
        Diagnostics,
    },
    error::ConvertError,
    types::{
        c64,
        MatX3,
        Result,
    },
    w90_parsers::{
        read_to_string,
        Tokens,
    },
};


/// Real-space lattice translations of `_hr.dat` with their Wigner-Seitz degeneracies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RVectorSet {
    pub rvecs:        MatX3<i64>,
    pub degeneracies: Vec<usize>,
}

impl RVectorSet {
    pub fn len(&self) -> usize {
        self.rvecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rvecs.is_empty()
    }

    /// Index of R = (0, 0, 0).
    pub fn origin(&self) -> Option<usize> {
        self.rvecs.iter().position(|r| *r == [0, 0, 0])
    }
}


/// Tight-binding Hamiltonian H(R) in the Wannier basis, read from `<seed>_hr.dat`.
#[derive(Debug, Clone)]
pub struct TightBinding {
    pub header:   String,
    pub num_wf:   usize,
    pub rvectors: RVectorSet,
    /// shape = (nrpt, num_wf, num_wf), Fermi energy already subtracted at R = 0
    pub hamr:     Array3<c64>,
}

impl TightBinding {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized), fermi_energy: f64, tolerance: f64) -> Result<Checked<Self>> {
        let path = path.as_ref();
        let txt = read_to_string(path)?;
        Self::from_txt(&txt, &path.display().to_string(), fermi_energy, tolerance)
    }

    pub fn from_txt(txt: &str, fname: &str, fermi_energy: f64, tolerance: f64) -> Result<Checked<Self>> {
        let mut diagnostics = Diagnostics::new();
        let mut lines = txt.lines();

        let header = lines.next()
            .ok_or_else(|| ConvertError::malformed(fname, "empty file"))?
            .trim()
            .to_string();
        info!("reading {:20}...{}", fname, header);

        let num_wf = Self::parse_count(lines.next(), fname, "number of Wannier functions")?;
        if num_wf == 0 {
            return Err(ConvertError::malformed(fname, "number of Wannier functions must be positive"));
        }
        let nrpt   = Self::parse_count(lines.next(), fname, "number of R vectors")?;

        // Degeneracies, one token per R vector, possibly spanning several lines.
        let mut degeneracies = Vec::with_capacity(nrpt);
        while degeneracies.len() < nrpt {
            let line = lines.next()
                .ok_or_else(|| ConvertError::malformed(fname, "unexpected end of file while reading degeneracies"))?;
            let mut tokens = Tokens::new(fname, line);
            while let Ok(deg) = tokens.next_raw("degeneracy") {
                if degeneracies.len() >= nrpt {
                    return Err(ConvertError::malformed(fname, "wrong number of R vectors, too many degeneracies"));
                }
                let deg = deg.parse::<usize>()
                    .ok()
                    .filter(|&d| d > 0)
                    .ok_or_else(|| ConvertError::malformed(fname, format!("invalid degeneracy {:?}", deg)))?;
                degeneracies.push(deg);
            }
        }

        let mut records = lines.filter(|l| !l.trim().is_empty());
        let mut rvecs: MatX3<i64> = Vec::with_capacity(nrpt);
        let mut hamr = Array3::<c64>::zeros((nrpt, num_wf, num_wf));

        for ir in 0 .. nrpt {
            let mut rprev = [0i64; 3];
            for jj in 0 .. num_wf {
                for ii in 0 .. num_wf {
                    let line = records.next()
                        .ok_or_else(|| ConvertError::malformed(fname,
                                format!("unexpected end of file in block of R vector n. {}", ir)))?;
                    let mut tokens = Tokens::new(fname, line);
                    let rcurr = [
                        tokens.next_parse::<i64>("R vector")?,
                        tokens.next_parse::<i64>("R vector")?,
                        tokens.next_parse::<i64>("R vector")?,
                    ];
                    let iw = tokens.next_parse::<usize>("orbital index")?;
                    let jw = tokens.next_parse::<usize>("orbital index")?;
                    let re = tokens.next_parse::<f64>("matrix element")?;
                    let im = tokens.next_parse::<f64>("matrix element")?;

                    if iw != ii + 1 || jw != jj + 1 {
                        diagnostics.warn(DiagnosticKind::IrregularOrbitalIndex,
                            format!("Inconsistent indices at {}{} of R n. {}", ii, jj, ir));
                    }

                    if ii == 0 && jj == 0 {
                        rvecs.push(rcurr);
                        rprev = rcurr;
                    } else if rcurr != rprev {
                        diagnostics.error(DiagnosticKind::InconsistentRVector,
                            format!("Inconsistent indices for R vector n. {}", ir));
                    }

                    hamr[(ir, ii, jj)] = if rcurr == [0, 0, 0] && ii == jj {
                        c64::new(re - fermi_energy, im)
                    } else {
                        c64::new(re, im)
                    };
                }
            }
        }

        // Imaginary parts should vanish if the wannierisation worked fine.
        for (ir, block) in hamr.axis_iter(Axis(0)).enumerate() {
            let imax = block.iter().map(|v| v.im.abs()).fold(0.0, f64::max);
            if imax > tolerance {
                diagnostics.warn(DiagnosticKind::LargeImaginaryPart,
                    format!("H(R) has large complex components at R {} (max |Im| = {:.3e})", ir, imax));
            }
        }

        debug!("{} R vectors, {} WFs found in {}", nrpt, num_wf, fname);

        Ok(Checked::new(
            Self {
                header,
                num_wf,
                rvectors: RVectorSet { rvecs, degeneracies },
                hamr,
            },
            diagnostics))
    }

    fn parse_count(line: Option<&str>, fname: &str, what: &str) -> Result<usize> {
        let line = line.ok_or_else(|| ConvertError::malformed(fname, format!("missing {}", what)))?;
        line.trim()
            .parse::<usize>()
            .map_err(|_| ConvertError::malformed(fname, format!("Could not read {} from {:?}", what, line.trim())))
    }

    pub fn nrpt(&self) -> usize {
        self.rvectors.len()
    }

    /// H(R = 0) including all Wannier functions.
    pub fn onsite(&self) -> Option<ArrayView2<c64>> {
        self.rvectors.origin()
            .map(|ir| self.hamr.index_axis(Axis(0), ir))
    }
}
