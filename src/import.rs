//! Inventory import
//!
//! Walks a directory for inventory documents (`*.json`) and survey notes
//! (`*.txt`) and loads the sites and operators they describe into the store.
//!
//! Survey lines look like:
//!
//! ```text
//! # comment
//! site J100-B1 Barren: base_metals, carbon_compounds
//! operator Ana capacity=3 interplanetary_consolidation=2
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::{Operator, Site, SiteType};

/// Inventory records read from one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDocument {
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub operators: Vec<Operator>,
    #[serde(skip)]
    pub skipped: usize, // Survey lines that did not parse
}

/// Find all inventory files under a directory, in path order
pub fn find_inventory_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path
            .extension()
            .is_some_and(|ext| ext == "json" || ext == "txt")
        {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Line parser for survey notes
pub struct SurveyParser {
    site_re: Regex,
    operator_re: Regex,
    skill_re: Regex,
}

impl SurveyParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // site <id> <type>: <resource>, <resource>
            site_re: Regex::new(r"^site\s+(\S+)\s+(\w+)\s*:\s*(.*)$")?,
            // operator <name> capacity=<n> [<skill>=<level> ...]
            operator_re: Regex::new(
                r"^operator\s+(\S+)\s+capacity\s*=\s*(\d+)((?:\s+\w+\s*=\s*\d+)*)\s*$",
            )?,
            skill_re: Regex::new(r"(\w+)\s*=\s*(\d+)")?,
        })
    }

    pub fn parse(&self, content: &str) -> InventoryDocument {
        let mut document = InventoryDocument::default();

        for (number, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(site) = self.parse_site(line) {
                document.sites.push(site);
            } else if let Some(operator) = self.parse_operator(line) {
                document.operators.push(operator);
            } else {
                warn!(line = number + 1, text = line, "skipping unrecognized survey line");
                document.skipped += 1;
            }
        }

        document
    }

    fn parse_site(&self, line: &str) -> Option<Site> {
        let cap = self.site_re.captures(line)?;
        let site_type: SiteType = cap[2].parse().ok()?;
        let resources = cap[3]
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();

        Some(Site {
            id: cap[1].to_string(),
            site_type,
            resources,
        })
    }

    fn parse_operator(&self, line: &str) -> Option<Operator> {
        let cap = self.operator_re.captures(line)?;
        let capacity = cap[2].parse().ok()?;

        let mut skills = std::collections::BTreeMap::new();
        for skill in self.skill_re.captures_iter(&cap[3]) {
            skills.insert(skill[1].to_string(), skill[2].parse().ok()?);
        }

        Some(Operator {
            name: cap[1].to_string(),
            capacity,
            skills,
        })
    }
}

/// Parse a single inventory file
pub fn parse_inventory_file(parser: &SurveyParser, path: &Path) -> Result<InventoryDocument> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    } else {
        Ok(parser.parse(&content))
    }
}

/// Import every inventory file under `dir` into the database
pub fn import_directory(conn: &Connection, dir: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let parser = SurveyParser::new()?;

    info!(dir = %dir.display(), "scanning for inventory files");
    let files = find_inventory_files(dir)?;
    debug!(count = files.len(), "found inventory files");

    for path in &files {
        match parse_inventory_file(&parser, path) {
            Ok(document) => {
                for site in &document.sites {
                    db::upsert_site(conn, site)?;
                }
                for operator in &document.operators {
                    db::upsert_operator(conn, operator)?;
                }

                stats.files += 1;
                stats.sites += document.sites.len();
                stats.operators += document.operators.len();
                stats.skipped += document.skipped;

                debug!(
                    file = %path.display(),
                    sites = document.sites.len(),
                    operators = document.operators.len(),
                    "imported"
                );
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to import");
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub files: usize,
    pub sites: usize,
    pub operators: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} sites and {} operators from {} files. Skipped lines: {}, Errors: {}",
            self.sites, self.operators, self.files, self.skipped, self.errors
        )
    }
}
