use indexmap::IndexMap;

use crate::{
    archive::{
        Archive,
        Group,
    },
    types::Result,
};


/// Keeps the written groups in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    groups: IndexMap<String, Group>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Archive for MemoryArchive {
    fn write_group(&mut self, name: &str, group: &Group) -> Result<()> {
        self.groups.insert(name.to_string(), group.clone());
        Ok(())
    }
}
