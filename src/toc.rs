//! Addon manifest (`.toc`) parser.
//!
//! A toc file is line-oriented: `## Key: value` metadata directives followed
//! by the file list. Values may embed UI color escapes (`|cAARRGGBB` ...
//! `|r`) which are stripped for display. Missing keys read as `""`.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

/// File extension identifying an addon manifest.
pub const TOC_EXTENSION: &str = "toc";

/// Parsed manifest metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    pub title: String,
    pub author: String,
    pub interface: String,
    pub version: String,
    pub website: String,
    pub category: String,
    pub localizations: String,
    pub part_of: String,
    pub dependencies: String,
    pub load_on_demand: bool,
    pub curse_project_id: String,
    pub wowi_id: String,
}

impl Toc {
    /// Dependency names as a list (the raw field is comma-separated).
    pub fn dependency_list(&self) -> Vec<String> {
        self.dependencies
            .split(',')
            .map(str::trim)
            .filter(|dep| !dep.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Parses manifest text into a [`Toc`].
pub fn parse(text: &str) -> Toc {
    Toc {
        title: value_of(text, "Title"),
        author: value_of(text, "Author"),
        interface: value_of(text, "Interface"),
        version: value_of(text, "Version"),
        website: value_of(text, "X-Website"),
        category: value_of(text, "X-Category"),
        localizations: value_of(text, "X-Localizations"),
        part_of: value_of(text, "X-Part-Of"),
        dependencies: value_of(text, "Dependencies"),
        load_on_demand: value_of(text, "LoadOnDemand") == "1",
        curse_project_id: value_of(text, "X-Curse-Project-ID"),
        wowi_id: value_of(text, "X-WoWI-ID"),
    }
}

/// Reads and parses a manifest file.
pub fn parse_file(path: &Path) -> Result<Toc> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    Ok(parse(&text))
}

fn value_of(text: &str, key: &str) -> String {
    // Keys are fixed identifiers, so building the regex per lookup is cheap
    // enough and keeps the parser allocation-free between calls.
    let pattern = format!(r"(?m)^## ?{}:(.*?)$", regex::escape(key));
    let regex = Regex::new(&pattern).expect("toc key pattern is valid");
    match regex.captures(text) {
        Some(caps) => strip_escapes(caps[1].trim()),
        None => String::new(),
    }
}

/// Strips UI color escapes (`|cAARRGGBB`) and restore markers (`|r`).
fn strip_escapes(value: &str) -> String {
    let color = Regex::new(r"\|[a-zA-Z0-9]{9}").expect("color pattern is valid");
    let restore = Regex::new(r"\|r").expect("restore pattern is valid");
    let stripped = color.replace_all(value, "");
    restore.replace_all(&stripped, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
## Interface: 90002
## Title: |cff1784d1ElvUI|r
## Author: Elv
## Version: 12.18
## X-Website: https://www.tukui.org
## Dependencies: LibStub, Ace3
## LoadOnDemand: 1
## X-Curse-Project-ID: 333072
ElvUI.lua
ElvUI.xml
";

    #[test]
    fn parses_metadata_directives() {
        let toc = parse(SAMPLE);
        assert_eq!(toc.interface, "90002");
        assert_eq!(toc.author, "Elv");
        assert_eq!(toc.version, "12.18");
        assert_eq!(toc.website, "https://www.tukui.org");
        assert_eq!(toc.curse_project_id, "333072");
        assert!(toc.load_on_demand);
    }

    #[test]
    fn strips_color_escapes_from_values() {
        let toc = parse(SAMPLE);
        assert_eq!(toc.title, "ElvUI");
    }

    #[test]
    fn missing_keys_read_as_empty() {
        let toc = parse("## Title: Bare\n");
        assert_eq!(toc.title, "Bare");
        assert_eq!(toc.interface, "");
        assert_eq!(toc.wowi_id, "");
        assert!(!toc.load_on_demand);
    }

    #[test]
    fn dependency_list_splits_and_trims() {
        let toc = parse(SAMPLE);
        assert_eq!(toc.dependency_list(), vec!["LibStub", "Ace3"]);
        assert!(parse("").dependency_list().is_empty());
    }
}
