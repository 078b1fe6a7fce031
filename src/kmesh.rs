use itertools::iproduct;
use log::debug;
use ndarray::{
    Array1,
    Array2,
};

use crate::{
    error::ConvertError,
    types::{
        Result,
        MatX3,
    },
};


/// How the k-point mesh is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshMode {
    /// Full regular grid containing Gamma, the only supported generation mode.
    FullGrid,
    /// Grid size derived from the largest R vector in `_hr.dat`.
    FromRVectors,
}

impl MeshMode {
    /// Interprets the integer mesh mode of the `.inp` file.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
             0 => Ok(Self::FullGrid),
            -1 => Ok(Self::FromRVectors),
             _ => Err(ConvertError::UnsupportedConfiguration(
                     format!("Mesh generation mode not supported: {}", code))),
        }
    }
}


/// Uniform k-point mesh in fractional coordinates of the reciprocal lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct KMesh {
    pub size:    [usize; 3],
    /// shape = (nkpts, 3)
    pub kpts:    Array2<f64>,
    pub weights: Array1<f64>,
}

impl KMesh {
    /// Regular mesh including k = (0, 0, 0), the last axis runs fastest.
    ///
    /// Weights are equal because Wannier90 uses a uniform grid on the whole BZ.
    pub fn build(size: [usize; 3], mode: MeshMode) -> Result<Self> {
        if mode != MeshMode::FullGrid {
            return Err(ConvertError::UnsupportedConfiguration(
                    format!("Mesh generation mode not supported: {:?}", mode)));
        }
        if size.iter().any(|&n| n == 0) {
            return Err(ConvertError::UnsupportedConfiguration(
                    format!("Invalid k-mesh size: {:?}", size)));
        }

        let nkpts = size[0] * size[1] * size[2];
        let mut kpts = Array2::<f64>::zeros((nkpts, 3));
        for (ik, (ix, iy, iz)) in iproduct!(0 .. size[0], 0 .. size[1], 0 .. size[2]).enumerate() {
            kpts[(ik, 0)] = ix as f64 / size[0] as f64;
            kpts[(ik, 1)] = iy as f64 / size[1] as f64;
            kpts[(ik, 2)] = iz as f64 / size[2] as f64;
        }
        let weights = Array1::from_elem(nkpts, 1.0 / nkpts as f64);

        debug!("Built {}x{}x{} k-mesh with {} points", size[0], size[1], size[2], nkpts);
        Ok(Self { size, kpts, weights })
    }

    /// Mesh size `2*max(R_i)+1` along each axis.
    ///
    /// It coincides with the Wannier90 mesh only when that mesh size is odd: with n k-points
    /// along one direction Wannier90 produces 2*(n/2)+n%2 R points along it.
    pub fn size_from_rvectors(rvecs: &MatX3<i64>) -> [usize; 3] {
        let mut size = [1usize; 3];
        for idir in 0 .. 3 {
            let rmax = rvecs.iter().map(|r| r[idir]).max().unwrap_or(0).max(0);
            size[idir] = 2 * rmax as usize + 1;
        }
        size
    }

    pub fn from_rvectors(rvecs: &MatX3<i64>) -> Result<Self> {
        Self::build(Self::size_from_rvectors(rvecs), MeshMode::FullGrid)
    }

    pub fn nkpts(&self) -> usize {
        self.kpts.nrows()
    }

    /// Spin-polarized runs split the normalization over two channels.
    pub fn halve_weights(&mut self) {
        self.weights.mapv_inplace(|w| w * 0.5);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_build_counts_and_weights() {
        for size in [[1, 1, 1], [2, 3, 4], [5, 1, 2], [4, 4, 4]] {
            let mesh = KMesh::build(size, MeshMode::FullGrid).unwrap();
            let n = size[0] * size[1] * size[2];
            assert_eq!(mesh.nkpts(), n);
            assert!(mesh.weights.iter().all(|&w| w == 1.0 / n as f64));
            assert_abs_diff_eq!(mesh.weights.sum(), 1.0, epsilon = 1E-12);
        }
    }

    #[test]
    fn test_build_ordering() {
        let mesh = KMesh::build([2, 2, 2], MeshMode::FullGrid).unwrap();
        assert_eq!(mesh.kpts.row(0).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(mesh.kpts.row(1).to_vec(), vec![0.0, 0.0, 0.5]);
        assert_eq!(mesh.kpts.row(2).to_vec(), vec![0.0, 0.5, 0.0]);
        assert_eq!(mesh.kpts.row(7).to_vec(), vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_unsupported_mode() {
        assert!(matches!(KMesh::build([2, 2, 2], MeshMode::FromRVectors),
                         Err(ConvertError::UnsupportedConfiguration(_))));
        assert!(matches!(MeshMode::from_code(1),
                         Err(ConvertError::UnsupportedConfiguration(_))));
        assert!(matches!(KMesh::build([0, 2, 2], MeshMode::FullGrid),
                         Err(ConvertError::UnsupportedConfiguration(_))));
        assert_eq!(MeshMode::from_code(-1).unwrap(), MeshMode::FromRVectors);
    }

    #[test]
    fn test_size_from_rvectors() {
        let rvecs = vec![[-2, 0, -1], [0, 0, 0], [2, 1, 1], [1, -1, 0]];
        assert_eq!(KMesh::size_from_rvectors(&rvecs), [5, 3, 3]);
        assert_eq!(KMesh::size_from_rvectors(&vec![[0, 0, 0]]), [1, 1, 1]);
    }

    #[test]
    fn test_halve_weights() {
        let mut mesh = KMesh::build([2, 1, 1], MeshMode::FullGrid).unwrap();
        mesh.halve_weights();
        assert_abs_diff_eq!(mesh.weights.sum(), 0.5, epsilon = 1E-12);
    }
}
