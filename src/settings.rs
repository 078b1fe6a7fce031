//! User settings, layered as defaults < `~/.wan2dmft.toml` < explicit file < `WAN2DMFT_*` variables.

use std::path::{
    Path,
    PathBuf,
};

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{
        Env,
        Format,
        Serialized,
        Toml,
    },
};
use log::debug;
use serde::{
    Serialize,
    Deserialize,
};

use crate::{
    converter::ConverterOptions,
    error::ConvertError,
    rotation::RotationPolicy,
    types::{
        Result,
        W90_ZERO,
    },
};


pub const CONFIG_FNAME: &str = ".wan2dmft.toml";
pub const ENV_PREFIX: &str = "WAN2DMFT_";


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupNames {
    pub dft_input:      String,
    pub dft_misc_input: String,
}

impl Default for GroupNames {
    fn default() -> Self {
        Self {
            dft_input:      "dft_input".to_string(),
            dft_misc_input: "dft_misc_input".to_string(),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rot_mat_type:   RotationPolicy,
    pub bloch_basis:    bool,
    pub spin_polarized: bool,
    pub n_ks_bands:     usize,
    pub tolerance:      f64,
    pub groups:         GroupNames,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rot_mat_type:   RotationPolicy::HlocDiag,
            bloch_basis:    false,
            spin_polarized: false,
            n_ks_bands:     25,
            tolerance:      W90_ZERO,
            groups:         GroupNames::default(),
        }
    }
}

impl Settings {
    /// Path of the per-user configuration file, if a home directory exists.
    pub fn user_config_path() -> Option<PathBuf> {
        BaseDirs::new().map(|d| d.home_dir().join(CONFIG_FNAME))
    }

    /// Load the layered settings, `path` is an optional extra TOML file that must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(user) = Self::user_config_path() {
            debug!("Looking for user settings in {:?}", user);
            figment = figment.merge(Toml::file(user));
        }

        if let Some(p) = path {
            if !p.is_file() {
                return Err(ConvertError::FileUnavailable {
                    path: p.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "settings file not found"),
                });
            }
            figment = figment.merge(Toml::file(p));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConvertError::UnsupportedConfiguration(format!("invalid settings: {}", e)))
    }

    /// Default settings as TOML, a starting point for `~/.wan2dmft.toml`.
    pub fn template() -> Result<String> {
        toml::to_string_pretty(&Settings::default())
            .map_err(|e| ConvertError::UnsupportedConfiguration(e.to_string()))
    }

    pub fn converter_options(&self, seedname: impl Into<String>) -> ConverterOptions {
        ConverterOptions {
            seedname:       seedname.into(),
            rot_mat_type:   self.rot_mat_type,
            bloch_basis:    self.bloch_basis,
            spin_polarized: self.spin_polarized,
            n_ks_bands:     self.n_ks_bands,
            tolerance:      self.tolerance,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_layers() {
        Jail::expect_with(|jail| {
            jail.set_env("HOME", jail.directory().display().to_string());
            jail.create_file("extra.toml", r#"
                n_ks_bands = 30
                rot_mat_type = "combined"

                [groups]
                dft_misc_input = "misc"
            "#)?;
            jail.set_env("WAN2DMFT_BLOCH_BASIS", "true");
            jail.set_env("WAN2DMFT_GROUPS__DFT_INPUT", "dft");

            let s = Settings::load(Some(Path::new("extra.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(s.n_ks_bands, 30);
            assert_eq!(s.rot_mat_type, RotationPolicy::Wannier);
            assert!(s.bloch_basis);
            assert!(!s.spin_polarized);
            assert_eq!(s.groups.dft_input, "dft");
            assert_eq!(s.groups.dft_misc_input, "misc");
            assert_eq!(s.tolerance, W90_ZERO);
            Ok(())
        });
    }

    #[test]
    fn test_bad_policy() {
        Jail::expect_with(|jail| {
            jail.set_env("HOME", jail.directory().display().to_string());
            jail.set_env("WAN2DMFT_ROT_MAT_TYPE", "random");
            let ret = Settings::load(None);
            assert!(matches!(ret, Err(ConvertError::UnsupportedConfiguration(_))));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let ret = Settings::load(Some(Path::new("/nonexistent/wan2dmft.toml")));
        assert!(matches!(ret, Err(ConvertError::FileUnavailable { .. })));
    }

    #[test]
    fn test_template_round_trip() {
        let txt = Settings::template().unwrap();
        assert!(txt.contains("rot_mat_type = \"hloc_diag\""));
        let s: Settings = toml::from_str(&txt).unwrap();
        assert_eq!(s, Settings::default());
    }
}
