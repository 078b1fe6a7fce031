//! Conversion of Wannier90 output into the DMFT input records `dft_input` and `dft_misc_input`.
//!
//! Two basis conventions are supported. In the Wannier basis H(k) is the Fourier transform of
//! H(R) and the projectors are identity blocks. In the Bloch basis (`bloch_basis = true`) the
//! unitary matrices of Wannier90 turn H(k) and the projectors into the Kohn-Sham band basis,
//! which is what charge self-consistent calculations need.

use std::path::PathBuf;

use log::{
    info,
    debug,
};
use ndarray::{
    Array1,
    Array2,
    Array3,
    Array4,
    Array5,
    Axis,
    s,
};

use crate::{
    archive::{
        Archive,
        Dataset,
        Group,
    },
    diagnostics::{
        DiagnosticKind,
        Diagnostics,
        Severity,
    },
    error::ConvertError,
    fourier,
    kmesh::{
        KMesh,
        MeshMode,
    },
    linalg::{
        allclose,
        identity,
        is_hermitian,
    },
    projector,
    rotation::{
        self,
        RotationPolicy,
        Rotations,
    },
    shells::{
        CorrelatedShell,
        Shell,
        ShellEquivalence,
        total_dim,
    },
    types::{
        c64,
        Result,
        Spin,
        W90_ZERO,
    },
    w90_parsers::{
        eig::read_eig,
        hr::TightBinding,
        inp::W90Input,
        nscf::FermiWeights,
        umat::{
            UMatKind,
            UMatrices,
        },
    },
};


/// User-facing knobs of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterOptions {
    /// Path prefix of all input files, e.g. `data/SrVO3` for `data/SrVO3_hr.dat`.
    pub seedname:       String,
    pub rot_mat_type:   RotationPolicy,
    pub bloch_basis:    bool,
    /// Read `<seed>_up*` and `<seed>_down*` instead of `<seed>*`.
    pub spin_polarized: bool,
    /// Number of Kohn-Sham bands printed per k-point in `<seed>.nscf.out`.
    pub n_ks_bands:     usize,
    pub tolerance:      f64,
}

impl ConverterOptions {
    pub fn new(seedname: impl Into<String>) -> Self {
        Self {
            seedname:       seedname.into(),
            rot_mat_type:   RotationPolicy::HlocDiag,
            bloch_basis:    false,
            spin_polarized: false,
            n_ks_bands:     25,
            tolerance:      W90_ZERO,
        }
    }

    fn path(&self, seed: &str, ext: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", seed, ext))
    }

    fn spin_seeds(&self) -> Vec<String> {
        if self.spin_polarized {
            [Spin::Up, Spin::Down].iter()
                .map(|s| format!("{}{}", self.seedname, s.suffix()))
                .collect()
        } else {
            vec![self.seedname.clone()]
        }
    }
}


/// Bloch-basis data of one spin channel.
#[derive(Debug, Clone)]
pub struct BlochData {
    /// `_u.mat`
    pub umat: UMatrices,
    /// `_u_dis.mat`, absent for an isolated set of bands
    pub udis: Option<UMatrices>,
    /// `.eig`, shape = (nkpts, nbands), read together with `_u_dis.mat`
    pub eig:  Option<Array2<f64>>,
}


/// Everything read from the files of one spin channel.
#[derive(Debug, Clone)]
pub struct SpinChannel {
    pub tb:    TightBinding,
    pub bloch: Option<BlochData>,
}


/// Run-scoped sizes, fixed once the first spin channel has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionContext {
    pub n_k:        usize,
    pub n_spin:     usize,
    pub nrpt:       usize,
    pub nwf:        usize,
    pub dim_corr:   usize,
    /// Bands per k-point in the output basis, equals `nwf` without disentanglement.
    pub n_bands:    usize,
}


/// The `dft_input` record.
#[derive(Debug, Clone, PartialEq)]
pub struct DftInput {
    pub energy_unit:      f64,
    pub n_k:              usize,
    pub k_dep_projection: i64,
    pub sp:               bool,
    pub so:               bool,
    pub charge_below:     f64,
    pub density_required: f64,
    pub symm_op:          i64,
    pub shells:           Vec<Shell>,
    pub corr_shells:      Vec<CorrelatedShell>,
    pub use_rotations:    bool,
    pub rot_mat:          Vec<Array2<c64>>,
    pub rot_mat_time_inv: Vec<i64>,
    pub n_reps:           Vec<usize>,
    pub dim_reps:         Vec<usize>,
    pub t:                Vec<Array2<c64>>,
    /// shape = (n_k, n_spin)
    pub n_orbitals:       Array2<i64>,
    /// shape = (n_k, n_spin, n_corr_shells, max_dim, n_bands)
    pub proj_mat:         Array5<c64>,
    pub bz_weights:       Array1<f64>,
    /// shape = (n_k, n_spin, n_bands, n_bands)
    pub hopping:          Array4<c64>,
    pub equivalence:      ShellEquivalence,
    pub kpt_weights:      Array1<f64>,
    pub kpts:             Array2<f64>,
}

impl DftInput {
    pub fn n_shells(&self) -> usize {
        self.shells.len()
    }

    pub fn n_corr_shells(&self) -> usize {
        self.corr_shells.len()
    }

    pub fn to_group(&self) -> Group {
        let shells = self.shells.iter()
            .map(|sh| {
                let mut g = Group::new();
                g.insert("atom".into(), sh.atom.into());
                g.insert("sort".into(), sh.sort.into());
                g.insert("l".into(),    sh.l.into());
                g.insert("dim".into(),  sh.dim.into());
                Dataset::Group(g)
            })
            .collect::<Vec<_>>();
        let corr_shells = self.corr_shells.iter()
            .map(|sh| {
                let mut g = Group::new();
                g.insert("atom".into(), sh.atom.into());
                g.insert("sort".into(), sh.sort.into());
                g.insert("l".into(),    sh.l.into());
                g.insert("dim".into(),  sh.dim.into());
                g.insert("SO".into(),   sh.so.into());
                g.insert("irep".into(), sh.irep.into());
                Dataset::Group(g)
            })
            .collect::<Vec<_>>();
        let matrices = |v: &[Array2<c64>]| Dataset::List(v.iter().cloned().map(Dataset::from).collect());

        let mut g = Group::new();
        g.insert("energy_unit".into(),      self.energy_unit.into());
        g.insert("n_k".into(),              self.n_k.into());
        g.insert("k_dep_projection".into(), self.k_dep_projection.into());
        g.insert("SP".into(),               Dataset::flag(self.sp));
        g.insert("SO".into(),               Dataset::flag(self.so));
        g.insert("charge_below".into(),     self.charge_below.into());
        g.insert("density_required".into(), self.density_required.into());
        g.insert("symm_op".into(),          self.symm_op.into());
        g.insert("n_shells".into(),         self.n_shells().into());
        g.insert("shells".into(),           Dataset::List(shells));
        g.insert("n_corr_shells".into(),    self.n_corr_shells().into());
        g.insert("corr_shells".into(),      Dataset::List(corr_shells));
        g.insert("use_rotations".into(),    Dataset::flag(self.use_rotations));
        g.insert("rot_mat".into(),          matrices(&self.rot_mat));
        g.insert("rot_mat_time_inv".into(), Dataset::List(self.rot_mat_time_inv.iter().map(|&x| Dataset::Int(x)).collect()));
        g.insert("n_reps".into(),           Dataset::ints(&self.n_reps));
        g.insert("dim_reps".into(),         Dataset::ints(&self.dim_reps));
        g.insert("T".into(),                matrices(&self.t));
        g.insert("n_orbitals".into(),       self.n_orbitals.clone().into());
        g.insert("proj_mat".into(),         self.proj_mat.clone().into());
        g.insert("bz_weights".into(),       self.bz_weights.clone().into());
        g.insert("hopping".into(),          self.hopping.clone().into());
        g.insert("n_inequiv_shells".into(), self.equivalence.n_inequiv_shells.into());
        g.insert("corr_to_inequiv".into(),  Dataset::ints(&self.equivalence.corr_to_inequiv));
        g.insert("inequiv_to_corr".into(),  Dataset::ints(&self.equivalence.inequiv_to_corr));
        g.insert("kpt_weights".into(),      self.kpt_weights.clone().into());
        g.insert("kpts".into(),             self.kpts.clone().into());
        g
    }
}


/// The `dft_misc_input` record of Bloch-basis conversions.
#[derive(Debug, Clone, PartialEq)]
pub struct DftMiscInput {
    /// shape = (n_k, n_spin, n_bands)
    pub dft_fermi_weights: Array3<f64>,
    /// shape = (n_spin, n_k, 2), 0-based half-open band range
    pub band_window:       Array3<i64>,
}

impl DftMiscInput {
    pub fn from_fermi_weights(fw: &FermiWeights) -> Self {
        let dft_fermi_weights = fw.weights.clone().insert_axis(Axis(1));
        let band_window = fw.band_window.mapv(|x| x as i64).insert_axis(Axis(0));
        Self { dft_fermi_weights, band_window }
    }

    pub fn to_group(&self) -> Group {
        let mut g = Group::new();
        g.insert("dft_fermi_weights".into(), self.dft_fermi_weights.clone().into());
        g.insert("band_window".into(),       self.band_window.clone().into());
        g
    }
}


/// Result of a conversion together with everything noticed along the way.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub context:     ConversionContext,
    pub dft_input:   DftInput,
    pub misc:        Option<DftMiscInput>,
    pub diagnostics: Diagnostics,
}

impl Conversion {
    /// False if any error diagnostic was raised. Warnings alone keep the conversion valid.
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    pub fn ensure_succeeded(&self) -> Result<()> {
        if self.succeeded() {
            return Ok(());
        }
        let msg = self.diagnostics.iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.clone())
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConvertError::NumericalInvariantViolation(msg))
    }

    /// Write `dft_input` and, if present, `dft_misc_input` under the given group names.
    pub fn write_to(&self, archive: &mut impl Archive, dft_subgrp: &str, misc_subgrp: &str) -> Result<()> {
        archive.write_group(dft_subgrp, &self.dft_input.to_group())?;
        if let Some(misc) = self.misc.as_ref() {
            archive.write_group(misc_subgrp, &misc.to_group())?;
        }
        Ok(())
    }
}


pub struct Wannier90Converter {
    options: ConverterOptions,
}

impl Wannier90Converter {
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Read all files belonging to the seed name and convert them.
    pub fn convert(&self) -> Result<Conversion> {
        let opts = &self.options;
        if opts.bloch_basis && opts.spin_polarized {
            return Err(ConvertError::UnsupportedConfiguration(
                    "Fermi weights of spin-polarized Bloch-basis calculations are not implemented".to_string()));
        }

        let input = W90Input::from_file(&opts.path(&opts.seedname, ".inp"))?;
        let mut diagnostics = Diagnostics::new();

        let channels = opts.spin_seeds().iter()
            .map(|seed| self.read_channel(seed, &input, &mut diagnostics))
            .collect::<Result<Vec<_>>>()?;

        let mut conversion = self.convert_data(&input, &channels)?;

        if opts.bloch_basis {
            let ctx = &conversion.context;
            let fw = FermiWeights::from_file(&opts.path(&opts.seedname, ".nscf.out"),
                                             ctx.n_k, opts.n_ks_bands, ctx.n_bands)?;
            conversion.misc = Some(DftMiscInput::from_fermi_weights(&fw));
        }

        diagnostics.extend(conversion.diagnostics);
        conversion.diagnostics = diagnostics;
        Ok(conversion)
    }

    fn read_channel(&self, seed: &str, input: &W90Input, diagnostics: &mut Diagnostics) -> Result<SpinChannel> {
        let opts = &self.options;
        info!("The Hamiltonian in MLWF basis is extracted from {}* files ...", seed);

        let tb = TightBinding::from_file(&opts.path(seed, "_hr.dat"), input.fermi_energy, opts.tolerance)?
            .unpack_into(diagnostics);
        info!("... done: {} R vectors, {} WFs found", tb.nrpt(), tb.num_wf);

        if !opts.bloch_basis {
            return Ok(SpinChannel { tb, bloch: None });
        }

        info!("Writing archive in projector formalism: H(k) defined in KS Bloch basis");
        let umat = UMatrices::from_file(&opts.path(seed, "_u.mat"), UMatKind::Unitary)?;

        let udis_path = opts.path(seed, "_u_dis.mat");
        let (udis, eig) = if udis_path.is_file() {
            let udis = UMatrices::from_file(&udis_path, UMatKind::Disentanglement)?;
            let eig = read_eig(&opts.path(seed, ".eig"), udis.nkpts(), udis.num_bands)?;
            (Some(udis), Some(eig))
        } else {
            diagnostics.warn(DiagnosticKind::IsolatedBands,
                format!("File {} missing. Assuming an isolated set of bands. Check if this is what you want!",
                        udis_path.display()));
            (None, None)
        };

        Ok(SpinChannel { tb, bloch: Some(BlochData { umat, udis, eig }) })
    }

    /// Convert already parsed data, one [`SpinChannel`] per spin.
    ///
    /// The returned conversion has no `dft_misc_input`, that record needs the DFT output file.
    pub fn convert_data(&self, input: &W90Input, channels: &[SpinChannel]) -> Result<Conversion> {
        let opts = &self.options;
        let mut diagnostics = Diagnostics::new();

        let n_spin = channels.len();
        if n_spin == 0 || n_spin > 2 {
            return Err(ConvertError::InconsistentDimensions(
                    format!("expected 1 or 2 spin channels, got {}", n_spin)));
        }

        // shells
        let corr_shells = input.corr_shells.clone();
        let shells = corr_shells.iter().map(CorrelatedShell::to_shell).collect::<Vec<_>>();
        let dim_corr = total_dim(&corr_shells);
        info!("Total number of WFs expected in the correlated shells: {}", dim_corr);

        let equivalence = ShellEquivalence::detect(&corr_shells);
        info!("Number of inequivalent shells: {}", equivalence.n_inequiv_shells);
        info!("Shell representatives: {:?}", equivalence.inequiv_to_corr);
        info!("Mapping: {:?}", equivalence.shells_map());
        info!("Subtracting {} eV from the Fermi level.", input.fermi_energy);

        // mesh
        let first = &channels[0].tb;
        let mut mesh = match MeshMode::from_code(input.kmesh_mode)? {
            MeshMode::FullGrid => {
                let size = input.kmesh_size.ok_or_else(|| ConvertError::malformed(
                        format!("{}.inp", opts.seedname), "k-mesh size missing"))?;
                KMesh::build(size, MeshMode::FullGrid)?
            },
            MeshMode::FromRVectors => KMesh::from_rvectors(&first.rvectors.rvecs)?,
        };
        info!("The k-point grid has dimensions: {}, {}, {}", mesh.size[0], mesh.size[1], mesh.size[2]);

        // sizes
        let nwf = first.num_wf;
        let nrpt = first.nrpt();
        if nwf < dim_corr {
            return Err(ConvertError::InconsistentDimensions(
                    format!("number of WFs in the file ({}) smaller than number of correlated orbitals ({})", nwf, dim_corr)));
        } else if nwf > dim_corr {
            diagnostics.warn(DiagnosticKind::UncorrelatedOrbitals,
                format!("Number of WFs larger than correlated orbitals: WFs from {} to {} treated as uncorrelated",
                        dim_corr + 1, nwf));
        } else {
            info!("Number of WFs equal to number of correlated orbitals");
        }

        for (isp, ch) in channels.iter().enumerate().skip(1) {
            if ch.tb.nrpt() != nrpt {
                return Err(ConvertError::InconsistentDimensions(
                        format!("different number of R vectors for spin channel {}: {} vs {}", isp, ch.tb.nrpt(), nrpt)));
            }
            if ch.tb.num_wf != nwf {
                return Err(ConvertError::InconsistentDimensions(
                        format!("different number of WFs for spin channel {}: {} vs {}", isp, ch.tb.num_wf, nwf)));
            }
        }

        let n_bands = Self::check_bloch_data(channels, nwf, mesh.nkpts())?;
        let ctx = ConversionContext {
            n_k: mesh.nkpts(),
            n_spin,
            nrpt,
            nwf,
            dim_corr,
            n_bands,
        };
        debug!("{:?}", ctx);

        // rotations, the first spin channel is authoritative
        let mut rotations: Option<Rotations> = None;
        for (isp, ch) in channels.iter().enumerate() {
            let ham_corr0 = ch.tb.onsite()
                .ok_or_else(|| ConvertError::malformed(format!("{}_hr.dat", opts.seedname), "no R = (0, 0, 0) block"))?
                .slice(s![.. dim_corr, .. dim_corr])
                .to_owned();
            if !is_hermitian(&ham_corr0.view(), opts.tolerance) {
                return Err(ConvertError::NumericalInvariantViolation(
                        format!("H(R=0) matrix is not Hermitian for spin channel {}!", isp)));
            }

            let rot = rotation::solve(&corr_shells, &equivalence, &ham_corr0.view(), opts.rot_mat_type, opts.tolerance)
                .unpack_into(&mut diagnostics);

            match rotations.as_ref() {
                None => rotations = Some(rot),
                Some(reference) => {
                    if reference.succeeded && !rot.succeeded {
                        diagnostics.warn(DiagnosticKind::SpinRotationMismatch,
                            format!("Rotations cannot be used for spin component n. {}", isp));
                    }
                    let mismatch = reference.rot_mat.iter().zip(rot.rot_mat.iter())
                        .any(|(a, b)| a.dim() != b.dim() || !allclose(&a.view(), &b.view(), opts.tolerance));
                    if mismatch {
                        diagnostics.warn(DiagnosticKind::SpinRotationMismatch,
                            format!("Rotations for spin component n. {} do not match!", isp));
                    }
                },
            }
        }
        let Rotations { succeeded: use_rotations, rot_mat } = rotations
            .ok_or_else(|| ConvertError::InconsistentDimensions("no spin channel".to_string()))?;

        if n_spin == 2 {
            mesh.halve_weights();
        }

        // projectors
        let u_totals = channels.iter()
            .map(|ch| Self::total_unitary(ch, ctx.n_k, nwf))
            .collect::<Result<Vec<_>>>()?;
        let u_views = u_totals.iter().map(|u| u.view()).collect::<Vec<_>>();
        let proj_mat = projector::build(&corr_shells, &u_views)?;

        // hoppings
        let energy_unit = 1.0;
        let mut hopping = Array4::<c64>::zeros((ctx.n_k, n_spin, n_bands, n_bands));
        for (isp, ch) in channels.iter().enumerate() {
            let hamk = if n_bands > nwf {
                // entangled bands: Kohn-Sham eigenvalues on the diagonal
                let eig = ch.bloch.as_ref()
                    .and_then(|b| b.eig.as_ref())
                    .ok_or_else(|| ConvertError::InconsistentDimensions(
                            format!("band energies of spin channel {} missing", isp)))?;
                let mut hamk = Array3::<c64>::zeros((ctx.n_k, n_bands, n_bands));
                for ik in 0 .. ctx.n_k {
                    for ib in 0 .. n_bands {
                        hamk[(ik, ib, ib)] = c64::new(eig[(ik, ib)], 0.0);
                    }
                }
                hamk
            } else {
                let hamk = fourier::synthesize(&ch.tb.hamr.view(), &ch.tb.rvectors, &mesh);
                if opts.bloch_basis {
                    fourier::upfold(&hamk.view(), &u_totals[isp].view())
                } else {
                    hamk
                }
            };
            hopping.index_axis_mut(Axis(1), isp).assign(&hamk.mapv(|v| v * energy_unit));
        }

        // placeholder symmetry information
        let n_reps = vec![1; equivalence.n_inequiv_shells];
        let dim_reps = vec![0; equivalence.n_inequiv_shells];
        let t = equivalence.inequiv_to_corr.iter()
            .map(|&icrsh| {
                let n = corr_shells[icrsh].t_dim();
                Array2::<c64>::zeros((n, n))
            })
            .collect::<Vec<_>>();

        let dft_input = DftInput {
            energy_unit,
            n_k:              ctx.n_k,
            k_dep_projection: 0,
            sp:               n_spin == 2,
            so:               false,
            charge_below:     0.0,
            density_required: input.density_required,
            symm_op:          0,
            shells,
            rot_mat_time_inv: vec![0; corr_shells.len()],
            corr_shells,
            use_rotations,
            rot_mat,
            n_reps,
            dim_reps,
            t,
            n_orbitals:       Array2::from_elem((ctx.n_k, n_spin), n_bands as i64),
            proj_mat,
            bz_weights:       mesh.weights.clone(),
            hopping,
            equivalence,
            kpt_weights:      mesh.weights.clone(),
            kpts:             mesh.kpts.clone(),
        };

        Ok(Conversion {
            context: ctx,
            dft_input,
            misc: None,
            diagnostics,
        })
    }

    /// Validates the Bloch-basis matrices and returns the number of bands in the output basis.
    fn check_bloch_data(channels: &[SpinChannel], nwf: usize, nkpts: usize) -> Result<usize> {
        let mut n_bands: Option<usize> = None;

        for (isp, ch) in channels.iter().enumerate() {
            let nb = match ch.bloch.as_ref() {
                None => nwf,
                Some(b) => {
                    if b.umat.num_wf != nwf {
                        return Err(ConvertError::InconsistentDimensions(
                                "#WFs must be identical for *_u.mat and *_hr.dat".to_string()));
                    }
                    if b.umat.nkpts() != nkpts {
                        return Err(ConvertError::InconsistentDimensions(
                                format!("*_u.mat has {} k-points, the mesh has {}", b.umat.nkpts(), nkpts)));
                    }
                    match b.udis.as_ref() {
                        None => nwf,
                        Some(udis) => {
                            if udis.num_wf != b.umat.num_wf {
                                return Err(ConvertError::InconsistentDimensions(
                                        "#WFs must be identical for *_u.mat and *_u_dis.mat".to_string()));
                            }
                            if udis.nkpts() != nkpts {
                                return Err(ConvertError::InconsistentDimensions(
                                        format!("*_u_dis.mat has {} k-points, the mesh has {}", udis.nkpts(), nkpts)));
                            }
                            if let Some(eig) = b.eig.as_ref() {
                                if eig.dim() != (nkpts, udis.num_bands) {
                                    return Err(ConvertError::InconsistentDimensions(
                                            format!("band energies of shape {:?} do not match *_u_dis.mat", eig.dim())));
                                }
                            }
                            udis.num_bands
                        },
                    }
                },
            };

            match n_bands {
                None => n_bands = Some(nb),
                Some(n) if n != nb => return Err(ConvertError::InconsistentDimensions(
                        format!("spin channel {} has {} bands, expected {}", isp, nb, n))),
                _ => (),
            }
        }

        n_bands.ok_or_else(|| ConvertError::InconsistentDimensions("no spin channel".to_string()))
    }

    /// U_dis · U, with identities standing in for missing matrices.
    fn total_unitary(ch: &SpinChannel, nkpts: usize, nwf: usize) -> Result<Array3<c64>> {
        let eye = || {
            let mut ret = Array3::<c64>::zeros((nkpts, nwf, nwf));
            for mut m in ret.axis_iter_mut(Axis(0)) {
                m.assign(&identity(nwf));
            }
            ret
        };

        match ch.bloch.as_ref() {
            None => Ok(eye()),
            Some(b) => {
                let udis = match b.udis.as_ref() {
                    Some(udis) => udis.mats.clone(),
                    None => eye(),
                };
                projector::total_unitary(&udis.view(), &b.umat.mats.view())
            },
        }
    }
}


/// Converts the files of `seedname` and writes the records into `archive`.
pub fn convert_and_write(options: ConverterOptions,
                         archive: &mut impl Archive,
                         dft_subgrp: &str,
                         misc_subgrp: &str) -> Result<Conversion> {
    let conversion = Wannier90Converter::new(options).convert()?;
    conversion.write_to(archive, dft_subgrp, misc_subgrp)?;
    Ok(conversion)
}
