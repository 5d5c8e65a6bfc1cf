//! Migration Catalog - discovers migration files of a keyspace
//!
//! Files live in `<migrations_dir>/<keyspace>/` and are named
//! `{timestamp}_{name}.xml`. The timestamp is the unit's identity and its
//! lexicographic order is the apply order.

use chrono::{DateTime, Utc};
use cqlmig_core::config::is_cql_identifier;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::definitions::MigrationUnit;
use crate::error::{MigrationError, MigrationResult};

/// Extension of migration documents
pub const MIGRATION_EXTENSION: &str = "xml";

static FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)_([^/\\]+)\.xml$").expect("valid file name pattern"));
static CAMEL_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid camel case pattern"));
static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid camel case pattern"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("valid separator pattern"));

const TEMPLATE: &str = r#"<?xml version="1.0" ?>
<migration>
    <up>
        <!-- each CQL statement must be between <cql></cql> -->
        <cql><![CDATA[
Here cql up
        ]]></cql>
    </up>
    <down>
        <cql><![CDATA[
Here cql down
        ]]></cql>
    </down>
</migration>
"#;

/// Discovers and creates migration files
#[derive(Debug, Clone)]
pub struct MigrationCatalog {
    root: PathBuf,
}

impl MigrationCatalog {
    /// Create a catalog rooted at the migrations directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the migrations of one keyspace
    fn keyspace_dir(&self, keyspace: &str) -> MigrationResult<PathBuf> {
        validate_keyspace(keyspace)?;
        Ok(self.root.join(keyspace))
    }

    /// All units of a keyspace, ascending by identity.
    ///
    /// Entries that don't follow the naming contract are skipped.
    pub fn list_units(&self, keyspace: &str) -> MigrationResult<Vec<MigrationUnit>> {
        let dir = self.keyspace_dir(keyspace)?;
        if !dir.is_dir() {
            return Err(MigrationError::CatalogUnavailable {
                keyspace: keyspace.to_string(),
                path: dir,
            });
        }

        let entries = fs::read_dir(&dir).map_err(|source| MigrationError::CatalogRead {
            path: dir.clone(),
            source,
        })?;

        let mut units = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| MigrationError::CatalogRead {
                path: dir.clone(),
                source,
            })?;

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match parse_file_name(&path) {
                Some(unit) => units.push(unit),
                None => tracing::debug!(
                    path = %path.display(),
                    "Ignoring file outside the naming contract"
                ),
            }
        }

        units.sort_by(|a, b| a.identity.cmp(&b.identity));

        for pair in units.windows(2) {
            if pair[0].identity == pair[1].identity {
                return Err(MigrationError::DuplicateIdentity {
                    identity: pair[0].identity.clone(),
                    first: pair[0].path.clone(),
                    second: pair[1].path.clone(),
                });
            }
        }

        Ok(units)
    }

    /// Find the unit carrying `identity`
    pub fn resolve_by_identity(
        &self,
        keyspace: &str,
        identity: &str,
    ) -> MigrationResult<MigrationUnit> {
        self.list_units(keyspace)?
            .into_iter()
            .find(|unit| unit.identity == identity)
            .ok_or_else(|| MigrationError::unit_not_found(keyspace, identity))
    }

    /// Create a new migration file from the template, stamped with the current time
    pub fn create_unit(&self, keyspace: &str, name: &str) -> MigrationResult<PathBuf> {
        self.create_unit_at(keyspace, name, Utc::now())
    }

    /// Create a new migration file stamped with `created_at`
    pub fn create_unit_at(
        &self,
        keyspace: &str,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> MigrationResult<PathBuf> {
        let dir = self.keyspace_dir(keyspace)?;
        let slug = to_snake_case(name);
        if slug.is_empty() {
            return Err(MigrationError::MissingName);
        }

        fs::create_dir_all(&dir).map_err(|source| MigrationError::Generate {
            path: dir.clone(),
            source,
        })?;

        let file_name = format!(
            "{}_{}.{}",
            created_at.format("%Y%m%d%H%M%S"),
            slug,
            MIGRATION_EXTENSION
        );
        let path = dir.join(file_name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| MigrationError::Generate {
                path: path.clone(),
                source,
            })?;
        file.write_all(TEMPLATE.as_bytes())
            .map_err(|source| MigrationError::Generate {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), "Created migration file");
        Ok(path)
    }
}

/// Keyspace names become directory names and are interpolated into CQL,
/// so only unquoted identifiers are accepted.
pub fn validate_keyspace(keyspace: &str) -> MigrationResult<()> {
    if is_cql_identifier(keyspace) {
        Ok(())
    } else {
        Err(MigrationError::InvalidKeyspaceName {
            keyspace: keyspace.to_string(),
        })
    }
}

/// Split a file name into identity and display name
fn parse_file_name(path: &Path) -> Option<MigrationUnit> {
    let file_name = path.file_name()?.to_str()?;
    let captures = FILE_NAME.captures(file_name)?;
    Some(MigrationUnit {
        identity: captures[1].to_string(),
        display_name: captures[2].to_string(),
        path: path.to_path_buf(),
    })
}

/// `AddUserEmail` / `add user-email` -> `add_user_email`
pub fn to_snake_case(name: &str) -> String {
    let spaced = SEPARATORS.replace_all(name.trim(), "_");
    let words = CAMEL_WORD.replace_all(&spaced, "${1}_${2}");
    let snake = CAMEL_BOUNDARY.replace_all(&words, "${1}_${2}").to_lowercase();
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
