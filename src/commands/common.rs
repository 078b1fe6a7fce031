use std::{
    io::Write,
    fs,
    path::Path,
};

use anyhow::{
    bail,
    Context,
    Result,
};
use clap::ValueEnum;
use ndarray::Array1;


/// Storage backend of the `convert` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArchiveFormat {
    Json,
    /// Needs the `hdf5` feature at build time.
    Hdf5,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Hdf5 => "h5",
        }
    }
}


/// Write columns of equal length into a whitespace separated text file, `comment` becomes the
/// first line.
pub fn write_array_to_txt(file_name: &(impl AsRef<Path> + ?Sized), ys: Vec<&Array1<f64>>, comment: &str) -> Result<()> {
    let ncol = ys.len();
    let x = ys.first().context("At least one data set is needed")?;
    let nrow = x.len();

    if nrow == 0 || !ys.iter().all(|y| y.len() == nrow) {
        bail!("[WRT_ARRAY]: input data with zero length or they don't have consistent lengths");
    }

    let mut f = fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(file_name)?;

    writeln!(f, "# {}", comment.trim())?;

    for irow in 0 .. nrow {
        let mut s = String::with_capacity(16 * ncol + 1);
        for y in ys.iter() {
            s.push_str(&format!("  {:14.10}", y[irow]));
        }
        s.push('\n');

        f.write_all(s.as_bytes())?;
    }

    Ok(())
}
