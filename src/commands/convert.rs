use std::{
    fs,
    path::PathBuf,
};

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use log::{
    info,
    warn,
};

use crate::{
    OptProcess,
    archive::JsonArchive,
    commands::common::ArchiveFormat,
    converter::{
        Conversion,
        Wannier90Converter,
    },
    rotation::RotationPolicy,
    settings::Settings,
};


#[derive(Debug, Args)]
/// Convert Wannier90 output into the input records of DMFT calculations.
///
/// Reads <SEEDNAME>.inp and <SEEDNAME>_hr.dat. With --bloch-basis also
/// <SEEDNAME>_u.mat, <SEEDNAME>_u_dis.mat (optional), <SEEDNAME>.eig and
/// <SEEDNAME>.nscf.out. With --spin-polarized the Wannier90 files are looked up
/// as <SEEDNAME>_up* and <SEEDNAME>_down*.
///
/// Defaults of the options are read from ~/.wan2dmft.toml and WAN2DMFT_* environment
/// variables; command line arguments take precedence.
pub struct Convert {
    #[arg(required_unless_present = "gen_template")]
    /// Seed name of the Wannier90 calculation, may contain a directory.
    seedname: Option<String>,

    #[arg(short = 'r', long, value_enum)]
    /// Method to build the local rotation matrices.
    rot_mat_type: Option<RotationPolicy>,

    #[arg(long)]
    /// Express H(k) and the projectors in the Kohn-Sham Bloch basis.
    bloch_basis: bool,

    #[arg(long)]
    /// Read spin-up and spin-down files separately.
    spin_polarized: bool,

    #[arg(long)]
    /// Number of Kohn-Sham bands per k-point in <SEEDNAME>.nscf.out.
    n_ks_bands: Option<usize>,

    #[arg(long)]
    /// Refuse to write the archive if any consistency check failed.
    strict: bool,

    #[arg(short = 'f', long, value_enum, default_value_t = ArchiveFormat::Json)]
    /// Format of the output archive.
    format: ArchiveFormat,

    #[arg(short = 'o', long)]
    /// Output archive, defaults to <SEEDNAME>.json or <SEEDNAME>.h5.
    output: Option<PathBuf>,

    #[arg(short = 'c', long)]
    /// Extra settings file in TOML format.
    config: Option<PathBuf>,

    #[arg(long)]
    /// Write the default settings to ./wan2dmft.toml and exit.
    gen_template: bool,
}


fn print_summary(conversion: &Conversion) {
    let ctx = &conversion.context;
    let d = &conversion.dft_input;

    println!("{:>24} : {}", "k-points".bright_green(), ctx.n_k);
    println!("{:>24} : {}", "spin channels".bright_green(), ctx.n_spin);
    println!("{:>24} : {}", "R vectors".bright_green(), ctx.nrpt);
    println!("{:>24} : {}", "Wannier functions".bright_green(), ctx.nwf);
    println!("{:>24} : {}", "correlated orbitals".bright_green(), ctx.dim_corr);
    println!("{:>24} : {}", "bands".bright_green(), ctx.n_bands);
    println!("{:>24} : {} ({} inequivalent)", "correlated shells".bright_green(),
             d.n_corr_shells(), d.equivalence.n_inequiv_shells);
    println!("{:>24} : {}", "use rotations".bright_green(),
             if d.use_rotations { "yes".green() } else { "no".red() });

    if !conversion.diagnostics.is_empty() {
        println!("{:>24} :", "diagnostics".bright_yellow());
        for diag in conversion.diagnostics.iter() {
            println!("    {}", diag);
        }
    }
}


impl OptProcess for Convert {
    fn process(&self) -> anyhow::Result<()> {
        if self.gen_template {
            let fname = "wan2dmft.toml";
            fs::write(fname, Settings::template()?)
                .with_context(|| format!("Cannot write settings template to {}", fname))?;
            info!("Settings template written to {}", fname);
            return Ok(());
        }

        let seedname = self.seedname.as_deref().context("Seed name is required")?;

        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(r) = self.rot_mat_type {
            settings.rot_mat_type = r;
        }
        settings.bloch_basis |= self.bloch_basis;
        settings.spin_polarized |= self.spin_polarized;
        if let Some(n) = self.n_ks_bands {
            settings.n_ks_bands = n;
        }

        info!("Converting {} with rotation method {}", seedname, settings.rot_mat_type);
        let conversion = Wannier90Converter::new(settings.converter_options(seedname))
            .convert()
            .with_context(|| format!("Conversion of {} failed", seedname))?;

        print_summary(&conversion);

        if !conversion.succeeded() {
            if self.strict {
                conversion.ensure_succeeded()
                    .context("Consistency checks failed, nothing written")?;
            }
            warn!("Some consistency checks failed, double-check the rotation matrices before using the results.");
        }

        let output = self.output.clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.{}", seedname, self.format.extension())));
        let groups = &settings.groups;

        match self.format {
            ArchiveFormat::Json => {
                let mut ar = JsonArchive::new(&output);
                conversion.write_to(&mut ar, &groups.dft_input, &groups.dft_misc_input)?;
            },
            #[cfg(feature = "hdf5")]
            ArchiveFormat::Hdf5 => {
                let mut ar = crate::archive::Hdf5Archive::open(&output)?;
                conversion.write_to(&mut ar, &groups.dft_input, &groups.dft_misc_input)?;
            },
            #[cfg(not(feature = "hdf5"))]
            ArchiveFormat::Hdf5 => {
                anyhow::bail!("wan2dmft was built without HDF5 support, rebuild with `--features hdf5` or use `--format json`");
            },
        }

        info!("Results written to {:?}", output);
        Ok(())
    }
}
