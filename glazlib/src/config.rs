//! Locating the XML configuration documents GlazLib sessions can be opened from.
//!
//! The documents themselves are never read here, only their paths are handed to the library.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GlazError, GlazResult};

/// Environment variable naming an extra directory to search for configuration documents
pub const CONFIG_DIR_ENV: &str = "GLAZLIB_CONFIG_DIR";

/// The documents looked for, in order, when no name is given
pub const DEFAULT_CONFIG_NAMES: [&str; 2] = ["single_spectrometer.xml", "double_spectrometer.xml"];

/// `$GLAZLIB_CONFIG_DIR` if it is set, then `./configs`, then the working directory
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV) {
        dirs.push(PathBuf::from(dir));
    }
    dirs.push(PathBuf::from("configs"));
    dirs.push(env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    dirs
}

fn with_xml_extension(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".xml") {
        name.to_string()
    } else {
        format!("{name}.xml")
    }
}

/// Find a configuration document in `dirs`.
///
/// A `name` without an `.xml` extension gets one. Without a name, each of
/// [`DEFAULT_CONFIG_NAMES`] is looked for in every directory before moving on to the next.
pub fn find_config_file<P: AsRef<Path>>(name: Option<&str>, dirs: &[P]) -> GlazResult<PathBuf> {
    let names: Vec<String> = match name {
        Some(name) => vec![with_xml_extension(name)],
        None => DEFAULT_CONFIG_NAMES.iter().map(|s| s.to_string()).collect(),
    };

    let mut searched = Vec::new();
    for name in names.iter() {
        for dir in dirs {
            let path = dir.as_ref().join(name);
            if path.is_file() {
                tracing::debug!("found configuration {}", path.display());
                return Ok(path);
            }
            searched.push(path);
        }
    }
    Err(GlazError::ConfigNotFound {
        name: names.join(" or "),
        searched,
    })
}

/// Every `.xml` document in the directories of `dirs` that exist, sorted within each directory
pub fn list_available_configs<P: AsRef<Path>>(dirs: &[P]) -> GlazResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            continue;
        }
        let mut in_dir = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_xml = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
            if is_xml && path.is_file() {
                in_dir.push(path);
            }
        }
        in_dir.sort();
        found.extend(in_dir);
    }
    Ok(found)
}
