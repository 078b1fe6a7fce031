use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use log::info;

use crate::{
    OptProcess,
    commands::common::write_array_to_txt,
    kmesh::{
        KMesh,
        MeshMode,
    },
    types::W90_ZERO,
    w90_parsers::hr::TightBinding,
};


#[derive(Debug, Args)]
/// Write the uniform k-point mesh used by the converter.
///
/// The mesh size is given explicitly with --size, or derived from the largest R
/// vectors of a `_hr.dat` file as 2*max(R)+1 along each axis.
pub struct Kmesh {
    #[arg(short = 's', long, num_args(3), conflicts_with = "hrfile")]
    /// Mesh size along the three reciprocal lattice vectors.
    ///
    /// Example: --size 4 4 4
    size: Vec<usize>,

    #[arg(long)]
    /// Derive the mesh size from this `_hr.dat` file.
    hrfile: Option<PathBuf>,

    #[arg(long)]
    /// Halve the weights as for spin-polarized calculations.
    spin_polarized: bool,

    #[arg(short = 'o', long, default_value = "kmesh.txt")]
    /// Output text file with columns kx, ky, kz and weight.
    txtout: PathBuf,
}


impl OptProcess for Kmesh {
    fn process(&self) -> anyhow::Result<()> {
        let mut mesh = match (self.size.as_slice(), self.hrfile.as_ref()) {
            ([nx, ny, nz], None) => KMesh::build([*nx, *ny, *nz], MeshMode::FullGrid)?,
            ([], Some(hrfile)) => {
                info!("Deriving the k-mesh from {:?}", hrfile);
                let tb = TightBinding::from_file(hrfile, 0.0, W90_ZERO)?.value;
                KMesh::from_rvectors(&tb.rvectors.rvecs)?
            },
            _ => bail!("Either --size <NX> <NY> <NZ> or --hrfile <HRFILE> is required"),
        };

        if self.spin_polarized {
            mesh.halve_weights();
        }

        let kx = mesh.kpts.column(0).to_owned();
        let ky = mesh.kpts.column(1).to_owned();
        let kz = mesh.kpts.column(2).to_owned();
        let comment = format!("{} x {} x {} k-mesh, {} points: kx ky kz weight",
                              mesh.size[0], mesh.size[1], mesh.size[2], mesh.nkpts());

        info!("Writing k-mesh to {:?}", &self.txtout);
        write_array_to_txt(&self.txtout, vec![&kx, &ky, &kz, &mesh.weights], &comment)?;

        Ok(())
    }
}
