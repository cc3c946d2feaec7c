//! Parsing of the dispatcher's `<name>=<mount>[:<filter_path>]` positional
//! tokens (spec §6).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::validate::validate_name;

/// One `subvolume_name=live_mount_point[:filter_file_path]` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubvolumePair {
    pub name: String,
    pub mount_point: PathBuf,
    pub filter_path: Option<PathBuf>,
}

impl SubvolumePair {
    /// Parses one raw CLI token. Malformed tokens are configuration
    /// errors, reported with the offending token in the message.
    pub fn parse(token: &str) -> Result<Self> {
        let (name, rest) = token
            .split_once('=')
            .with_context(|| format!("malformed pair '{token}': expected 'name=mount[:filter]'"))?;

        validate_name("subvolume name", name)
            .with_context(|| format!("malformed pair '{token}'"))?;

        if rest.is_empty() {
            bail!("malformed pair '{token}': mount point must not be empty");
        }

        let (mount, filter) = match rest.split_once(':') {
            Some((mount, filter)) => (mount, Some(filter)),
            None => (rest, None),
        };

        if mount.is_empty() {
            bail!("malformed pair '{token}': mount point must not be empty");
        }
        if matches!(filter, Some("")) {
            bail!("malformed pair '{token}': filter path must not be empty when given");
        }

        Ok(SubvolumePair {
            name: name.to_string(),
            mount_point: PathBuf::from(mount),
            filter_path: filter.map(PathBuf::from),
        })
    }
}
