//! Migration document parsing
//!
//! A document has exactly one `<up>` and one `<down>` section under a
//! `<migration>` root; each section holds zero or more `<cql>` blocks whose
//! text (usually CDATA) is one statement.

use roxmltree::{Document, Node};
use std::fs;

use crate::definitions::{MigrationScript, MigrationUnit};
use crate::error::{MigrationError, MigrationResult};

/// Read and parse the document of a unit
pub fn read_script(unit: &MigrationUnit) -> MigrationResult<MigrationScript> {
    let content = fs::read_to_string(&unit.path).map_err(|e| {
        MigrationError::malformed(&unit.identity, &unit.path, format!("cannot read file: {}", e))
    })?;
    parse_script(unit, &content)
}

/// Parse document content on behalf of `unit`; errors name the unit
pub fn parse_script(unit: &MigrationUnit, content: &str) -> MigrationResult<MigrationScript> {
    let malformed = |reason: String| MigrationError::malformed(&unit.identity, &unit.path, reason);

    let doc = Document::parse(content).map_err(|e| malformed(format!("invalid XML: {}", e)))?;

    let root = doc.root_element();
    if !root.has_tag_name("migration") {
        return Err(malformed(format!(
            "root element must be <migration>, found <{}>",
            root.tag_name().name()
        )));
    }

    let up = section(root, "up").map_err(&malformed)?;
    let down = section(root, "down").map_err(&malformed)?;

    Ok(MigrationScript {
        up: statements(up, "up").map_err(&malformed)?,
        down: statements(down, "down").map_err(&malformed)?,
    })
}

fn section<'a, 'input>(root: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>, String> {
    let mut found = root.children().filter(|n| n.is_element() && n.has_tag_name(name));
    let first = found
        .next()
        .ok_or_else(|| format!("missing <{}> section", name))?;
    if found.next().is_some() {
        return Err(format!("more than one <{}> section", name));
    }
    Ok(first)
}

fn statements(section: Node<'_, '_>, name: &str) -> Result<Vec<String>, String> {
    section
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("cql"))
        .enumerate()
        .map(|(index, cql)| {
            let text: String = cql
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect();
            let statement = text.trim();
            if statement.is_empty() {
                Err(format!("<cql> block {} of <{}> is empty", index + 1, name))
            } else {
                Ok(statement.to_string())
            }
        })
        .collect()
}
