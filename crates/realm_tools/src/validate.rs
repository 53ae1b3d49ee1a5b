//! Data validation utilities.
//!
//! Each RON file is parsed on its own so a syntax error names its file,
//! then the parts are merged and checked for broken references. Scenarios
//! are checked by building their world against the merged catalog.

use std::path::{Path, PathBuf};

use thiserror::Error;

use realm_core::data::Catalog;
use realm_headless::Scenario;

/// Why validation failed.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A path could not be listed or read.
    #[error("Cannot read '{path}': {source}")]
    Unreadable {
        /// Offending path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The data was read but is not consistent.
    #[error("Validation failed with {} problem(s)", .0.len())]
    Failed(Vec<String>),
}

/// Entry counts of a valid catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    /// Factions.
    pub factions: usize,
    /// Biomes.
    pub biomes: usize,
    /// Resources.
    pub resources: usize,
    /// Infrastructure.
    pub infrastructure: usize,
    /// Units.
    pub units: usize,
    /// Techs.
    pub techs: usize,
    /// World events.
    pub world_events: usize,
    /// Items.
    pub items: usize,
}

impl CatalogCounts {
    /// Count every table.
    #[must_use]
    pub fn of(catalog: &Catalog) -> Self {
        Self {
            factions: catalog.factions.len(),
            biomes: catalog.biomes.len(),
            resources: catalog.resources.len(),
            infrastructure: catalog.infrastructure.len(),
            units: catalog.units.len(),
            techs: catalog.techs.len(),
            world_events: catalog.world_events.len(),
            items: catalog.items.len(),
        }
    }
}

/// A catalog that passed validation.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Files merged, in merge order.
    pub files: Vec<PathBuf>,
    /// The merged catalog.
    pub catalog: Catalog,
    /// Table sizes.
    pub counts: CatalogCounts,
}

fn ron_files(path: &Path) -> Result<Vec<PathBuf>, ValidationError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = std::fs::read_dir(path).map_err(|source| ValidationError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    Ok(files)
}

/// Validate a catalog file or every RON file in a directory.
///
/// # Errors
///
/// [`ValidationError::Unreadable`] if the path cannot be read, otherwise
/// [`ValidationError::Failed`] with every parse error and broken reference.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport, ValidationError> {
    let files = ron_files(path)?;
    let mut problems = Vec::new();
    if files.is_empty() {
        problems.push(format!("No .ron files under '{}'", path.display()));
    }

    let mut catalog = Catalog::default();
    for file in &files {
        let text = std::fs::read_to_string(file).map_err(|source| ValidationError::Unreadable {
            path: file.display().to_string(),
            source,
        })?;
        match Catalog::from_ron_str(&text) {
            Ok(part) => {
                tracing::debug!(path = %file.display(), "Parsed");
                catalog.merge(part);
            }
            Err(e) => problems.push(format!("{}: {e}", file.display())),
        }
    }

    // References into an unparsed file would all be reported as missing.
    if problems.is_empty() {
        problems.extend(catalog.validate());
    }
    if !problems.is_empty() {
        return Err(ValidationError::Failed(problems));
    }

    let counts = CatalogCounts::of(&catalog);
    Ok(ValidationReport {
        files,
        catalog,
        counts,
    })
}

/// Build a scenario's world against `catalog` and check its invariants.
///
/// # Errors
///
/// [`ValidationError::Failed`] if the scenario does not parse, names ids
/// the catalog lacks, or produces an inconsistent world.
pub fn validate_scenario(catalog: &Catalog, path: &Path) -> Result<(), ValidationError> {
    let fail = |message: String| ValidationError::Failed(vec![format!("{}: {message}", path.display())]);
    let scenario = Scenario::load(path).map_err(|e| fail(e.to_string()))?;
    let state = scenario
        .build(catalog, scenario.seed)
        .map_err(|e| fail(e.to_string()))?;
    let problems: Vec<String> = state
        .check_invariants(catalog)
        .into_iter()
        .map(|p| format!("{}: {p}", path.display()))
        .collect();
    if !problems.is_empty() {
        return Err(ValidationError::Failed(problems));
    }
    tracing::debug!(scenario = %scenario.name, "Scenario ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets")
    }

    #[test]
    fn test_shipped_data_is_valid() {
        let report = validate_data_directory(&assets().join("data")).unwrap();
        assert_eq!(report.files.len(), 5);
        assert_eq!(report.counts.factions, 3);
        assert_eq!(
            CatalogCounts::of(&realm_test_utils::fixtures::shipped_catalog()),
            report.counts
        );
    }

    #[test]
    fn test_single_file_is_accepted() {
        let report = validate_data_directory(&assets().join("test/catalog.ron")).unwrap();
        assert_eq!(report.files.len(), 1);
    }

    #[test]
    fn test_parse_error_names_its_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ron"), "Catalog(hostiles: [])").unwrap();
        std::fs::write(dir.path().join("b.ron"), "Catalog(units: [").unwrap();
        match validate_data_directory(dir.path()) {
            Err(ValidationError::Failed(problems)) => {
                assert_eq!(problems.len(), 1);
                assert!(problems[0].contains("b.ron"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_broken_reference_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ron"), r#"Catalog(hostiles: ["ghost"])"#).unwrap();
        let Err(ValidationError::Failed(problems)) = validate_data_directory(dir.path()) else {
            panic!("expected failure");
        };
        assert!(problems.iter().any(|p| p.contains("ghost")));
    }

    #[test]
    fn test_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_data_directory(dir.path()),
            Err(ValidationError::Failed(_))
        ));
    }

    #[test]
    fn test_shipped_scenarios_validate() {
        let report = validate_data_directory(&assets().join("data")).unwrap();
        for name in ["skirmish.ron", "three_crowns.ron"] {
            validate_scenario(&report.catalog, &assets().join("scenarios").join(name)).unwrap();
        }
    }

    #[test]
    fn test_scenario_with_unknown_faction_fails() {
        let report = validate_data_directory(&assets().join("data")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ron");
        std::fs::write(
            &path,
            r#"Scenario(name: "bad", world: WorldConfig(width: 16, height: 12, factions: [FactionStart(id: "nobody")]))"#,
        )
        .unwrap();
        assert!(validate_scenario(&report.catalog, &path).is_err());
    }
}
