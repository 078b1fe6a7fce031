pub mod common;
pub mod convert;
pub mod hr;
pub mod kmesh;
