//! Accumulated, non-fatal findings of a conversion.

use std::fmt;

use colored::Colorize;
use log::{
    error,
    warn,
};


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Result is usable but should be double-checked.
    Warning,
    /// Result violates an invariant, the success flag is cleared.
    Error,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Orbital indices in a `_hr.dat` record do not match the expected position.
    IrregularOrbitalIndex,
    /// R vector of a record differs from the first record of its block.
    InconsistentRVector,
    /// H(R) carries imaginary parts above tolerance.
    LargeImaginaryPart,
    /// `_u_dis.mat` is missing, an isolated set of bands is assumed.
    IsolatedBands,
    /// More Wannier functions than correlated orbitals.
    UncorrelatedOrbitals,
    /// Rotation method `none` was requested.
    UnphysicalRotation,
    /// On-site block does not have the expected shape.
    WrongBlockStructure,
    /// Degenerate on-site eigenvalues in a shell with equivalent partners.
    DegenerateEigenvalues,
    /// Equivalent shells have different on-site eigenvalues.
    EigenvalueMismatch,
    /// Rotation matrix is not unitary.
    NonUnitaryRotation,
    /// Rotation does not map the on-site block onto its representative.
    WrongMapping,
    /// Rotations of a later spin channel differ from the first one.
    SpinRotationMismatch,
}


#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind:     DiagnosticKind,
    pub severity: Severity,
    pub message:  String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "WARNING".bright_yellow(),
            Severity::Error   => "ERROR".bright_red(),
        };
        write!(f, "[{}] {:?}: {}", tag, self.kind, self.message)
    }
}


/// Ordered list of diagnostics. Pushing also forwards to the log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(kind, Severity::Warning, message.into());
    }

    pub fn error(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(kind, Severity::Error, message.into());
    }

    fn push(&mut self, kind: DiagnosticKind, severity: Severity, message: String) {
        match severity {
            Severity::Warning => warn!("{:?}: {}", kind, message),
            Severity::Error   => error!("{:?}: {}", kind, message),
        }
        self.items.push(Diagnostic { kind, severity, message });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}


/// A value together with the diagnostics gathered while producing it.
#[derive(Debug, Clone)]
pub struct Checked<T> {
    pub value:       T,
    pub diagnostics: Diagnostics,
}

impl<T> Checked<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        Self { value, diagnostics }
    }

    /// Moves the diagnostics into `sink` and returns the bare value.
    pub fn unpack_into(self, sink: &mut Diagnostics) -> T {
        sink.extend(self.diagnostics);
        self.value
    }
}
