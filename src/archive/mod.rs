//! Storage of the converted records.
//!
//! A record is a [`Group`]: an ordered map from field name to [`Dataset`]. Backends only need to
//! know how to persist those two types.

mod memory;
mod json;
#[cfg(feature = "hdf5")]
mod h5;

pub use memory::MemoryArchive;
pub use json::JsonArchive;
#[cfg(feature = "hdf5")]
pub use h5::Hdf5Archive;

use indexmap::IndexMap;
use ndarray::{
    Array,
    ArrayD,
    Dimension,
};
use serde::{
    Serialize,
    Deserialize,
};

use crate::types::{
    c64,
    Result,
};


pub type Group = IndexMap<String, Dataset>;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Dataset {
    Int(i64),
    Float(f64),
    IntArray(ArrayD<i64>),
    FloatArray(ArrayD<f64>),
    ComplexArray(ArrayD<c64>),
    /// Heterogeneous sequence, e.g. one matrix per shell.
    List(Vec<Dataset>),
    Group(Group),
}

impl Dataset {
    /// Booleans are stored as 0/1 integers.
    pub fn flag(b: bool) -> Self {
        Self::Int(b as i64)
    }

    pub fn ints(v: &[usize]) -> Self {
        Self::List(v.iter().map(|&x| Self::Int(x as i64)).collect())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v)   => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_complex_array(&self) -> Option<&ArrayD<c64>> {
        match self {
            Self::ComplexArray(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_float_array(&self) -> Option<&ArrayD<f64>> {
        match self {
            Self::FloatArray(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Dataset]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }
}

impl From<i64> for Dataset {
    fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<usize> for Dataset {
    fn from(v: usize) -> Self { Self::Int(v as i64) }
}

impl From<f64> for Dataset {
    fn from(v: f64) -> Self { Self::Float(v) }
}

impl<D: Dimension> From<Array<i64, D>> for Dataset {
    fn from(a: Array<i64, D>) -> Self { Self::IntArray(a.into_dyn()) }
}

impl<D: Dimension> From<Array<f64, D>> for Dataset {
    fn from(a: Array<f64, D>) -> Self { Self::FloatArray(a.into_dyn()) }
}

impl<D: Dimension> From<Array<c64, D>> for Dataset {
    fn from(a: Array<c64, D>) -> Self { Self::ComplexArray(a.into_dyn()) }
}

impl From<Vec<Dataset>> for Dataset {
    fn from(v: Vec<Dataset>) -> Self { Self::List(v) }
}

impl From<Group> for Dataset {
    fn from(g: Group) -> Self { Self::Group(g) }
}


/// Destination of converted records.
///
/// Writing a group replaces whatever was previously stored under the same name, so repeating a
/// conversion is idempotent.
pub trait Archive {
    fn write_group(&mut self, name: &str, group: &Group) -> Result<()>;
}
