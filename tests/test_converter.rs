use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use approx::assert_abs_diff_eq;
use tempdir::TempDir;

use wan2dmft::{
    c64,
    ConvertError,
    ConverterOptions,
    DiagnosticKind,
    RotationPolicy,
    Wannier90Converter,
    archive::{
        Dataset,
        JsonArchive,
        MemoryArchive,
    },
    converter::convert_and_write,
};


macro_rules! get_fpath_in_current_dir {
    ($fname:expr) => {{
        let mut path = PathBuf::from(file!());
        path.pop();
        path.push($fname);
        path
    }}
}


fn seed_of(fname: &str) -> String {
    get_fpath_in_current_dir!(fname).display().to_string()
}


const SINGLE_INP: &str = "\
0 1 1 1
1.0
1
0 0 0 1 0 0
";

const SINGLE_HR: &str = "\
 written on 19Oct2026 at 10:00:00
          1
          1
    1
    0    0    0    1    1    0.500000    0.000000
";


fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (fname, content) in files {
        fs::write(dir.join(fname), content).unwrap();
    }
}


#[test]
fn test_single_orbital() {
    let dir = TempDir::new("test_single_orbital").unwrap();
    write_files(dir.path(), &[("single.inp", SINGLE_INP), ("single_hr.dat", SINGLE_HR)]);
    let seed = dir.path().join("single").display().to_string();

    let ret = Wannier90Converter::new(ConverterOptions::new(seed)).convert().unwrap();
    assert!(ret.succeeded());
    let d = &ret.dft_input;
    assert_eq!(d.hopping.shape(), &[1, 1, 1, 1]);
    assert_abs_diff_eq!(d.hopping[(0, 0, 0, 0)], c64::new(0.5, 0.0), epsilon = 1E-12);
    assert_eq!(d.rot_mat.len(), 1);
    assert_eq!(d.rot_mat[0][(0, 0)], c64::new(1.0, 0.0));
    assert!(ret.misc.is_none());
}


#[test]
fn test_fermi_energy_subtracted() {
    let dir = TempDir::new("test_fermi_energy").unwrap();
    let inp = format!("{}0.2\n", SINGLE_INP);
    write_files(dir.path(), &[("single.inp", &inp), ("single_hr.dat", SINGLE_HR)]);
    let seed = dir.path().join("single").display().to_string();

    let ret = Wannier90Converter::new(ConverterOptions::new(seed)).convert().unwrap();
    assert_abs_diff_eq!(ret.dft_input.hopping[(0, 0, 0, 0)], c64::new(0.3, 0.0), epsilon = 1E-12);
}


#[test]
fn test_malformed_header() {
    let dir = TempDir::new("test_malformed_header").unwrap();
    let hr = SINGLE_HR.replacen("          1\n", "          1.5\n", 1);
    write_files(dir.path(), &[("single.inp", SINGLE_INP), ("single_hr.dat", &hr)]);
    let seed = dir.path().join("single").display().to_string();

    let ret = Wannier90Converter::new(ConverterOptions::new(seed)).convert();
    assert!(matches!(ret, Err(ConvertError::MalformedInput { .. })));
}


#[test]
fn test_missing_files() {
    let dir = TempDir::new("test_missing_files").unwrap();
    write_files(dir.path(), &[("single.inp", SINGLE_INP)]);
    let seed = dir.path().join("single").display().to_string();

    let ret = Wannier90Converter::new(ConverterOptions::new(seed)).convert();
    assert!(matches!(ret, Err(ConvertError::FileUnavailable { .. })));
}


#[test]
fn test_chain_hoppings() {
    let ret = Wannier90Converter::new(ConverterOptions::new(seed_of("data/chain"))).convert().unwrap();
    assert!(ret.succeeded());

    let d = &ret.dft_input;
    assert_eq!(d.n_k, 4);
    assert_eq!(d.kpts.column(0).to_vec(), vec![0.0, 0.25, 0.5, 0.75]);
    assert_eq!(d.bz_weights.to_vec(), vec![0.25; 4]);
    let expected = [-1.75, 0.25, 2.25, 0.25];
    for (ik, e) in expected.iter().enumerate() {
        assert_abs_diff_eq!(d.hopping[(ik, 0, 0, 0)], c64::new(*e, 0.0), epsilon = 1E-10);
    }
}


#[test]
fn test_disentangled_bloch_basis() {
    let mut opts = ConverterOptions::new(seed_of("data/dis"));
    opts.bloch_basis = true;
    opts.n_ks_bands = 3;
    let ret = Wannier90Converter::new(opts).convert().unwrap();
    assert!(ret.succeeded());
    assert!(!ret.diagnostics.contains(DiagnosticKind::IsolatedBands));

    let d = &ret.dft_input;
    assert_eq!(ret.context.n_bands, 2);
    assert_eq!(d.n_orbitals[(0, 0)], 2);
    assert_eq!(d.hopping.shape(), &[1, 1, 2, 2]);
    assert_abs_diff_eq!(d.hopping[(0, 0, 0, 0)], c64::new(-1.0, 0.0), epsilon = 1E-12);
    assert_abs_diff_eq!(d.hopping[(0, 0, 1, 1)], c64::new(2.0, 0.0), epsilon = 1E-12);
    assert_abs_diff_eq!(d.hopping[(0, 0, 0, 1)], c64::new(0.0, 0.0), epsilon = 1E-12);

    assert_abs_diff_eq!(d.proj_mat[(0, 0, 0, 0, 0)], c64::new(0.6, 0.0), epsilon = 1E-12);
    assert_abs_diff_eq!(d.proj_mat[(0, 0, 0, 0, 1)], c64::new(0.8, 0.0), epsilon = 1E-12);

    let misc = ret.misc.as_ref().unwrap();
    assert_eq!(misc.band_window.shape(), &[1, 1, 2]);
    assert_eq!(misc.band_window[(0, 0, 0)], 1);
    assert_eq!(misc.band_window[(0, 0, 1)], 3);
    assert_eq!(misc.dft_fermi_weights.shape(), &[1, 1, 2]);
    assert_abs_diff_eq!(misc.dft_fermi_weights[(0, 0, 0)], 0.9, epsilon = 1E-12);
    assert_abs_diff_eq!(misc.dft_fermi_weights[(0, 0, 1)], 0.1, epsilon = 1E-12);
}


#[test]
fn test_isolated_bloch_basis() {
    let dir = TempDir::new("test_isolated_bloch").unwrap();
    let hr = "\
 written on 19Oct2026 at 10:00:00
          2
          1
    1
    0    0    0    1    1    1.000000    0.000000
    0    0    0    2    1    0.000000    0.000000
    0    0    0    1    2    0.000000    0.000000
    0    0    0    2    2    3.000000    0.000000
";
    // U swaps the two Wannier functions
    let umat = "\
 written on 19Oct2026 at 10:00:00
           1           2           2

  0.0000000000  0.0000000000  0.0000000000
  0.0000000000  0.0000000000
  1.0000000000  0.0000000000
  1.0000000000  0.0000000000
  0.0000000000  0.0000000000
";
    let inp = "0 1 1 1\n2.0\n2\n0 0 0 1 0 0\n1 1 0 1 0 0\n";
    let nscf = "\
     End of band structure calculation
          k = 0.0000 0.0000 0.0000 (   811 PWs)   bands (ev):
     1.0000   3.0000
     occupation numbers
     1.0000   0.0000
";
    write_files(dir.path(), &[("iso.inp", inp), ("iso_hr.dat", hr), ("iso_u.mat", umat), ("iso.nscf.out", nscf)]);

    let mut opts = ConverterOptions::new(dir.path().join("iso").display().to_string());
    opts.bloch_basis = true;
    opts.n_ks_bands = 2;
    let ret = Wannier90Converter::new(opts).convert().unwrap();
    assert!(ret.diagnostics.contains(DiagnosticKind::IsolatedBands));
    assert!(ret.succeeded());

    let d = &ret.dft_input;
    assert_abs_diff_eq!(d.hopping[(0, 0, 0, 0)], c64::new(3.0, 0.0), epsilon = 1E-12);
    assert_abs_diff_eq!(d.hopping[(0, 0, 1, 1)], c64::new(1.0, 0.0), epsilon = 1E-12);
    // first Wannier function lives in the second band
    assert_abs_diff_eq!(d.proj_mat[(0, 0, 0, 0, 1)], c64::new(1.0, 0.0), epsilon = 1E-12);
    assert_abs_diff_eq!(d.proj_mat[(0, 0, 1, 0, 0)], c64::new(1.0, 0.0), epsilon = 1E-12);
    assert_eq!(d.equivalence.n_inequiv_shells, 2);
}


#[test]
fn test_wannier_count_mismatch() {
    let dir = TempDir::new("test_wannier_count_mismatch").unwrap();
    let umat = "\
 written on 19Oct2026 at 10:00:00
           1           2           2

  0.0000000000  0.0000000000  0.0000000000
  1.0000000000  0.0000000000
  0.0000000000  0.0000000000
  0.0000000000  0.0000000000
  1.0000000000  0.0000000000
";
    write_files(dir.path(), &[("single.inp", SINGLE_INP), ("single_hr.dat", SINGLE_HR), ("single_u.mat", umat)]);

    let mut opts = ConverterOptions::new(dir.path().join("single").display().to_string());
    opts.bloch_basis = true;
    let ret = Wannier90Converter::new(opts).convert();
    assert!(matches!(ret, Err(ConvertError::InconsistentDimensions(_))));
}


#[test]
fn test_spin_polarized() {
    let dir = TempDir::new("test_spin_polarized").unwrap();
    let down = SINGLE_HR.replace("0.500000", "0.700000");
    write_files(dir.path(), &[
        ("single.inp", SINGLE_INP),
        ("single_up_hr.dat", SINGLE_HR),
        ("single_down_hr.dat", &down),
    ]);

    let mut opts = ConverterOptions::new(dir.path().join("single").display().to_string());
    opts.spin_polarized = true;
    let ret = Wannier90Converter::new(opts).convert().unwrap();

    let d = &ret.dft_input;
    assert!(d.sp);
    assert_eq!(d.bz_weights.to_vec(), vec![0.5]);
    assert_eq!(d.kpt_weights.to_vec(), vec![0.5]);
    assert_eq!(d.hopping.shape(), &[1, 2, 1, 1]);
    assert_abs_diff_eq!(d.hopping[(0, 1, 0, 0)], c64::new(0.7, 0.0), epsilon = 1E-12);

    let mut opts = ConverterOptions::new(dir.path().join("single").display().to_string());
    opts.spin_polarized = true;
    opts.bloch_basis = true;
    let ret = Wannier90Converter::new(opts).convert();
    assert!(matches!(ret, Err(ConvertError::UnsupportedConfiguration(_))));
}


#[test]
fn test_rotation_policies_on_equivalent_shells() {
    let dir = TempDir::new("test_rotation_policies").unwrap();
    // two equivalent p-like shells of dimension 2, the second one rotated by 90 degrees
    let hr = "\
 written on 19Oct2026 at 10:00:00
          4
          1
    1
    0    0    0    1    1    1.000000    0.000000
    0    0    0    2    1    0.000000    0.000000
    0    0    0    3    1    0.000000    0.000000
    0    0    0    4    1    0.000000    0.000000
    0    0    0    1    2    0.000000    0.000000
    0    0    0    2    2    2.000000    0.000000
    0    0    0    3    2    0.000000    0.000000
    0    0    0    4    2    0.000000    0.000000
    0    0    0    1    3    0.000000    0.000000
    0    0    0    2    3    0.000000    0.000000
    0    0    0    3    3    2.000000    0.000000
    0    0    0    4    3    0.000000    0.000000
    0    0    0    1    4    0.000000    0.000000
    0    0    0    2    4    0.000000    0.000000
    0    0    0    3    4    0.000000    0.000000
    0    0    0    4    4    1.000000    0.000000
";
    let inp = "0 1 1 1\n4.0\n2\n0 0 1 2 0 0\n1 0 1 2 0 0\n";
    write_files(dir.path(), &[("rot.inp", inp), ("rot_hr.dat", hr)]);
    let seed = dir.path().join("rot").display().to_string();

    for policy in [RotationPolicy::HlocDiag, RotationPolicy::Wannier] {
        let mut opts = ConverterOptions::new(seed.clone());
        opts.rot_mat_type = policy;
        let ret = Wannier90Converter::new(opts).convert().unwrap();
        assert!(ret.succeeded(), "{:?}", policy);
        assert!(ret.dft_input.use_rotations);
        assert_eq!(ret.dft_input.equivalence.corr_to_inequiv, vec![0, 0]);
    }

    let mut opts = ConverterOptions::new(seed);
    opts.rot_mat_type = RotationPolicy::None;
    let ret = Wannier90Converter::new(opts).convert().unwrap();
    assert!(ret.diagnostics.contains(DiagnosticKind::UnphysicalRotation));
}


#[test]
fn test_json_archive_idempotent() {
    let dir = TempDir::new("test_json_idempotent").unwrap();
    let out = dir.path().join("chain.json");

    let mut ar = JsonArchive::new(&out);
    convert_and_write(ConverterOptions::new(seed_of("data/chain")), &mut ar, "dft_input", "dft_misc_input").unwrap();
    let first = fs::read_to_string(&out).unwrap();
    convert_and_write(ConverterOptions::new(seed_of("data/chain")), &mut ar, "dft_input", "dft_misc_input").unwrap();
    let second = fs::read_to_string(&out).unwrap();
    assert_eq!(first, second);

    assert_eq!(ar.group_names().unwrap(), vec!["dft_input"]);
    let g = ar.read_group("dft_input").unwrap().unwrap();
    assert_eq!(g["n_k"], Dataset::Int(4));
    let hopping = g["hopping"].as_complex_array().unwrap();
    assert_eq!(hopping.shape(), &[4, 1, 1, 1]);
    assert_abs_diff_eq!(hopping[[2, 0, 0, 0]], c64::new(2.25, 0.0), epsilon = 1E-10);
}


#[test]
fn test_misc_group_written() {
    let mut opts = ConverterOptions::new(seed_of("data/dis"));
    opts.bloch_basis = true;
    opts.n_ks_bands = 3;

    let mut ar = MemoryArchive::new();
    convert_and_write(opts, &mut ar, "dft", "misc").unwrap();
    assert_eq!(ar.len(), 2);
    let misc = ar.group("misc").unwrap();
    assert!(misc.contains_key("dft_fermi_weights"));
    assert!(misc.contains_key("band_window"));
    assert_eq!(ar.group("dft").and_then(|g| g["SP"].as_int()), Some(0));
}
