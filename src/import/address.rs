//! Address file parsing.

use crate::error::ImportError;
use crate::traits::FileSystem;
use anyhow::Result;
use std::io::{BufRead, Lines};
use std::path::Path;

/// One resource to import, parsed from one address file line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Address the tool will track the resource under
    pub address: String,
    /// Provider-side identifier of the existing object
    pub external_id: String,
    /// Target region for the provider
    pub context: String,
    /// The line as it appeared in the address file
    pub line: String,
}

impl ImportRequest {
    /// Split one non-empty line into exactly three fields
    pub fn parse_line(line: &str, separator: &str, line_number: usize) -> Result<Self, ImportError> {
        let fields: Vec<&str> = line.split(separator).collect();

        match fields.as_slice() {
            [address, external_id, context] => Ok(Self {
                address: address.to_string(),
                external_id: external_id.to_string(),
                context: context.to_string(),
                line: line.to_string(),
            }),
            _ => Err(ImportError::MalformedInput {
                line_number,
                fields: fields.len(),
                line: line.to_string(),
            }),
        }
    }

    /// Original line text, used in status lines
    pub fn describe(&self) -> &str {
        &self.line
    }
}

/// Lazy, single-pass reader over an address file
pub struct AddressSource {
    lines: Lines<Box<dyn BufRead + Send>>,
    separator: String,
    line_number: usize,
}

impl AddressSource {
    pub fn open(fs: &dyn FileSystem, path: &Path, separator: &str) -> Result<Self> {
        let reader = fs.open_read(path).map_err(|e| {
            ImportError::Setup(format!(
                "cannot open address file {}: {:#}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            lines: reader.lines(),
            separator: separator.to_string(),
            line_number: 0,
        })
    }
}

impl Iterator for AddressSource {
    type Item = Result<ImportRequest, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(ImportError::Io(e))),
            };
            self.line_number += 1;

            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            return Some(ImportRequest::parse_line(
                line,
                &self.separator,
                self.line_number,
            ));
        }
    }
}
