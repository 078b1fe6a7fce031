use std::path::Path;

use hdf5::{
    File as H5File,
    Group as H5Group,
};
use log::info;
use ndarray::{
    ArrayD,
    Dimension,
    IxDyn,
};

use crate::{
    archive::{
        Archive,
        Dataset,
        Group,
    },
    types::{
        c64,
        Result,
    },
};


/// HDF5 file in the layout expected by DMFT codes.
///
/// Complex arrays get a trailing axis of length 2 holding (re, im); lists become sub-groups with
/// keys "0", "1", ...
pub struct Hdf5Archive {
    file: H5File,
}

impl Hdf5Archive {
    /// Opens the file for appending, creating it if it does not exist.
    pub fn open(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let file = H5File::append(path.as_ref())?;
        Ok(Self { file })
    }
}

impl Archive for Hdf5Archive {
    fn write_group(&mut self, name: &str, group: &Group) -> Result<()> {
        if self.file.link_exists(name) {
            self.file.unlink(name)?;
        }
        let g = self.file.create_group(name)?;
        for (key, ds) in group.iter() {
            write_dataset(&g, key, ds)?;
        }
        self.file.flush()?;
        info!("Group {:?} written to {:?}", name, self.file.filename());
        Ok(())
    }
}


fn split_complex(a: &ArrayD<c64>) -> ArrayD<f64> {
    let ndim = a.ndim();
    let mut shape = a.shape().to_vec();
    shape.push(2);
    ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
        let idx = idx.slice();
        let v = a[&idx[.. ndim]];
        if idx[ndim] == 0 { v.re } else { v.im }
    })
}


fn write_dataset(g: &H5Group, name: &str, ds: &Dataset) -> Result<()> {
    match ds {
        Dataset::Int(v)   => { g.new_dataset::<i64>().create(name)?.write_scalar(v)?; },
        Dataset::Float(v) => { g.new_dataset::<f64>().create(name)?.write_scalar(v)?; },
        Dataset::IntArray(a)   => { g.new_dataset_builder().with_data(a).create(name)?; },
        Dataset::FloatArray(a) => { g.new_dataset_builder().with_data(a).create(name)?; },
        Dataset::ComplexArray(a) => {
            g.new_dataset_builder().with_data(&split_complex(a)).create(name)?;
        },
        Dataset::List(items) => {
            let sub = g.create_group(name)?;
            for (i, item) in items.iter().enumerate() {
                write_dataset(&sub, &i.to_string(), item)?;
            }
        },
        Dataset::Group(inner) => {
            let sub = g.create_group(name)?;
            for (key, item) in inner.iter() {
                write_dataset(&sub, key, item)?;
            }
        },
    }
    Ok(())
}
