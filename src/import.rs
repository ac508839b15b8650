//! Recipe definition import
//!
//! Reads `*.recipes` text files and loads them into the recipe database.
//! One recipe per line:
//!
//! ```text
//! # comment
//! recipe iron-plate: 20 Iron Plate <- 30 Iron Ingot @ Constructor
//! alt recipe cast-screw: 50 Screw <- 12.5 Iron Ingot @ Constructor
//! recipe rotor: 4 Rotor <- 20 Iron Rod, 100 Screw @ Assembler
//! ```
//!
//! Quantities are items per minute for one machine.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use regex::Regex;
use rusqlite::Connection;
use walkdir::WalkDir;

use crate::db;
use crate::error::ImportError;
use crate::models::{ItemRate, Recipe};

/// Line parser for recipe definition files
pub struct RecipeParser {
    recipe_re: Regex,
    quantity_re: Regex,
}

impl RecipeParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            recipe_re: Regex::new(
                r"^(alt\s+)?recipe\s+([\w.-]+)\s*:\s*(.+?)\s*<-\s*(.+?)\s*@\s*(.+?)\s*$",
            )?,
            quantity_re: Regex::new(r"^(\d+(?:\.\d+)?|\.\d+)\s+(.+?)$")?,
        })
    }

    fn parse_quantity(&self, text: &str, line: usize) -> Result<ItemRate, ImportError> {
        let text = text.trim();
        let bad = || ImportError::Quantity {
            line,
            text: text.to_string(),
        };
        let cap = self.quantity_re.captures(text).ok_or_else(bad)?;
        let rate: f64 = cap[1].parse().map_err(|_| bad())?;
        if rate <= 0.0 {
            return Err(bad());
        }
        Ok(ItemRate::new(cap[2].trim(), rate))
    }

    /// Parse one definition line. Blank lines and `#` comments yield `None`.
    pub fn parse_line(&self, text: &str, line: usize) -> Result<Option<Recipe>, ImportError> {
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            return Ok(None);
        }

        let cap = self
            .recipe_re
            .captures(text)
            .ok_or(ImportError::Syntax { line })?;
        let id = cap[2].to_string();
        let output = self.parse_quantity(&cap[3], line)?;
        let inputs = cap[4]
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| self.parse_quantity(part, line))
            .collect::<Result<Vec<_>, _>>()?;
        if inputs.is_empty() {
            return Err(ImportError::NoInputs { line, id });
        }

        let mut recipe = Recipe::new(id, output, inputs, cap[5].trim());
        recipe.alternate = cap.get(1).is_some();
        Ok(Some(recipe))
    }

    /// Parse a whole file, collecting good recipes and line errors separately
    pub fn parse_file(&self, content: &str) -> (Vec<Recipe>, Vec<ImportError>) {
        let mut recipes = Vec::new();
        let mut errors = Vec::new();
        for (idx, text) in content.lines().enumerate() {
            match self.parse_line(text, idx + 1) {
                Ok(Some(recipe)) => recipes.push(recipe),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }
        (recipes, errors)
    }
}

/// Find all recipe definition files under `dir`, sorted by path
pub fn find_recipe_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "recipes"))
        .collect();
    files.sort();
    files
}

/// Import all recipe files under `dir` into the database
pub fn import_to_database(conn: &Connection, dir: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    let parser = RecipeParser::new()?;
    info!("scanning {} for recipe files", dir.display());
    let files = find_recipe_files(dir);
    info!("found {} recipe files", files.len());

    for path in &files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let (recipes, errors) = parser.parse_file(&content);

        for recipe in &recipes {
            db::upsert_recipe(conn, recipe)
                .with_context(|| format!("Failed to store recipe {}", recipe.id))?;
            if recipe.alternate {
                stats.alternates += 1;
            }
        }
        for error in &errors {
            warn!("{}: {}", path.display(), error);
        }

        stats.files += 1;
        stats.recipes += recipes.len();
        stats.errors += errors.len();
    }

    Ok(stats)
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportStats {
    pub files: usize,
    pub recipes: usize,
    pub alternates: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} recipes ({} alternates) from {} files. Errors: {}",
            self.recipes, self.alternates, self.files, self.errors
        )
    }
}
