use std::path::PathBuf;

use anyhow::{
    Context,
    ensure,
};
use clap::Args;
use colored::Colorize;
use log::info;
use ndarray::Axis;

use crate::{
    OptProcess,
    fourier,
    kmesh::{
        KMesh,
        MeshMode,
    },
    linalg::is_hermitian,
    types::W90_ZERO,
    w90_parsers::hr::TightBinding,
};


#[derive(Debug, Args)]
/// Inspect a Wannier90 `_hr.dat` file.
///
/// Prints the number of Wannier functions and R vectors, checks the Hermiticity of H(R=0),
/// the largest imaginary matrix element and the round-trip error of H(R) -> H(k) -> H(R).
pub struct Hr {
    #[arg(default_value = "./wannier90_hr.dat")]
    /// Hamiltonian file in the Wannier basis.
    hrfile: PathBuf,

    #[arg(short = 'e', long, default_value_t = 0.0, allow_negative_numbers = true)]
    /// Fermi energy subtracted from the on-site energies, in eV.
    efermi: f64,

    #[arg(short = 'k', long, num_args(3))]
    /// K-mesh for the round trip. Derived from the R vectors if omitted.
    ///
    /// Example: --kmesh 4 4 4
    kmesh: Vec<usize>,
}


impl OptProcess for Hr {
    fn process(&self) -> anyhow::Result<()> {
        info!("Reading {:?}", &self.hrfile);
        let checked = TightBinding::from_file(&self.hrfile, self.efermi, W90_ZERO)
            .with_context(|| format!("Cannot parse {:?}", &self.hrfile))?;
        let tb = checked.value;

        let mesh = if self.kmesh.is_empty() {
            KMesh::from_rvectors(&tb.rvectors.rvecs)?
        } else {
            ensure!(self.kmesh.len() == 3, "Three k-mesh sizes are required, got {:?}", self.kmesh);
            KMesh::build([self.kmesh[0], self.kmesh[1], self.kmesh[2]], MeshMode::FullGrid)?
        };

        let max_imag = tb.hamr.iter()
            .map(|v| v.im.abs())
            .fold(0.0f64, f64::max);
        let hermitian = tb.onsite()
            .map(|h0| is_hermitian(&h0, W90_ZERO));

        let hamk = fourier::synthesize(&tb.hamr.view(), &tb.rvectors, &mesh);
        let back = fourier::inverse(&hamk.view(), &tb.rvectors, &mesh);
        let roundtrip = (&back - &tb.hamr).iter()
            .map(|v| v.norm())
            .fold(0.0f64, f64::max);
        let bandwidth = hamk.axis_iter(Axis(0))
            .flat_map(|hk| (0 .. tb.num_wf).map(move |i| hk[(i, i)].re).collect::<Vec<_>>())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));

        println!("{:>26} : {}", "header".bright_green(), tb.header);
        println!("{:>26} : {}", "Wannier functions".bright_green(), tb.num_wf);
        println!("{:>26} : {}", "R vectors".bright_green(), tb.nrpt());
        println!("{:>26} : {} x {} x {}", "k-mesh".bright_green(), mesh.size[0], mesh.size[1], mesh.size[2]);
        println!("{:>26} : {}", "H(R=0) Hermitian".bright_green(), match hermitian {
            Some(true)  => "yes".green(),
            Some(false) => "NO".red(),
            None        => "no R = 0 block".red(),
        });
        println!("{:>26} : {:.3e}", "max |Im H(R)|".bright_green(), max_imag);
        println!("{:>26} : {:.3e}", "round-trip error".bright_green(), roundtrip);
        println!("{:>26} : [{:.4}, {:.4}]", "diagonal H(k) range".bright_green(), bandwidth.0, bandwidth.1);

        for diag in checked.diagnostics.iter() {
            println!("    {}", diag);
        }

        Ok(())
    }
}
