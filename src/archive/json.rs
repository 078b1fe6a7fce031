use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use indexmap::IndexMap;
use log::info;
use serde_json::Value;

use crate::{
    archive::{
        Archive,
        Group,
    },
    error::ConvertError,
    types::Result,
};


/// JSON document whose top-level keys are group names.
///
/// Every write loads the whole document, replaces one group and writes it back.
#[derive(Debug, Clone)]
pub struct JsonArchive {
    path: PathBuf,
}

impl JsonArchive {
    pub fn new(path: &(impl AsRef<Path> + ?Sized)) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<IndexMap<String, Value>> {
        if !self.path.is_file() {
            return Ok(IndexMap::new());
        }
        let txt = fs::read_to_string(&self.path)
            .map_err(|source| ConvertError::FileUnavailable { path: self.path.clone(), source })?;
        if txt.trim().is_empty() {
            return Ok(IndexMap::new());
        }
        Ok(serde_json::from_str(&txt)?)
    }

    pub fn read_group(&self, name: &str) -> Result<Option<Group>> {
        match self.load()?.shift_remove(name) {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None    => Ok(None),
        }
    }

    pub fn group_names(&self) -> Result<Vec<String>> {
        Ok(self.load()?.keys().cloned().collect())
    }
}

impl Archive for JsonArchive {
    fn write_group(&mut self, name: &str, group: &Group) -> Result<()> {
        let mut doc = self.load()?;
        doc.insert(name.to_string(), serde_json::to_value(group)?);

        let txt = serde_json::to_string_pretty(&doc)?;
        fs::write(&self.path, txt)
            .map_err(|source| ConvertError::FileUnavailable { path: self.path.clone(), source })?;
        info!("Group {:?} written to {:?}", name, self.path);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        archive::Dataset,
        types::c64,
    };
    use ndarray::arr2;
    use tempdir::TempDir;

    #[test]
    fn test_write_and_replace() {
        let dir = TempDir::new("test_json_archive").unwrap();
        let path = dir.path().join("out.json");
        let mut ar = JsonArchive::new(&path);

        let mut g = Group::new();
        g.insert("n_k".to_string(), Dataset::Int(1));
        g.insert("hopping".to_string(), Dataset::from(arr2(&[[c64::new(0.5, -0.1)]])));
        ar.write_group("dft_input", &g).unwrap();

        let mut misc = Group::new();
        misc.insert("band_window".to_string(), Dataset::ints(&[20, 25]));
        ar.write_group("dft_misc_input", &misc).unwrap();

        g.insert("n_k".to_string(), Dataset::Int(27));
        ar.write_group("dft_input", &g).unwrap();

        assert_eq!(ar.group_names().unwrap(), vec!["dft_input", "dft_misc_input"]);
        let back = ar.read_group("dft_input").unwrap().unwrap();
        assert_eq!(back, g);
        assert!(ar.read_group("missing").unwrap().is_none());
    }
}
