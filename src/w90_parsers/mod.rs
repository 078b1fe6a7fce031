//! Readers for the plain-text files written by Wannier90 and the DFT code.

pub mod inp;
pub mod hr;
pub mod umat;
pub mod eig;
pub mod nscf;

use std::{
    fs,
    path::Path,
    str::{
        FromStr,
        SplitWhitespace,
    },
};

use crate::{
    error::ConvertError,
    types::Result,
};


pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|source| ConvertError::FileUnavailable {
            path: path.to_path_buf(),
            source,
        })
}


/// Whitespace separated token stream that reports which file and item failed.
pub(crate) struct Tokens<'a> {
    fname: &'a str,
    it:    SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    pub fn new(fname: &'a str, txt: &'a str) -> Self {
        Self {
            fname,
            it: txt.split_whitespace(),
        }
    }

    pub fn next_raw(&mut self, what: &str) -> Result<&'a str> {
        self.it.next()
            .ok_or_else(|| ConvertError::malformed(self.fname, format!("unexpected end of file while reading {}", what)))
    }

    pub fn next_parse<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let tok = self.next_raw(what)?;
        tok.parse::<T>()
            .map_err(|_| ConvertError::malformed(self.fname, format!("cannot parse {:?} as {}", tok, what)))
    }

    /// `None` at the end of the stream. A token that is present must parse.
    pub fn next_parse_opt<T: FromStr>(&mut self, what: &str) -> Result<Option<T>> {
        if self.it.clone().next().is_none() {
            return Ok(None);
        }
        self.next_parse(what).map(Some)
    }
}
