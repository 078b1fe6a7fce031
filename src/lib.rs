pub mod types;
pub mod error;
pub mod diagnostics;
pub mod linalg;
pub mod kmesh;
pub mod shells;
pub mod w90_parsers;
pub mod fourier;
pub mod rotation;
pub mod projector;
pub mod converter;
pub mod archive;
pub mod settings;
pub mod commands;
pub mod cli;

pub use cli::OptProcess;

pub use types::{
    c64,
    Result,
};

pub use error::ConvertError;

pub use diagnostics::{
    Checked,
    Diagnostic,
    DiagnosticKind,
    Diagnostics,
};

pub use w90_parsers::{
    hr::TightBinding,
    inp::W90Input,
};

pub use converter::{
    Conversion,
    ConverterOptions,
    Wannier90Converter,
};

pub use rotation::RotationPolicy;

pub use settings::Settings;
