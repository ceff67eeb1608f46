//! Property table for `${name}` resolution.

use crate::pom::PomDocument;
use crate::version::property_name;
use std::borrow::Cow;
use std::collections::HashMap;

/// Nested references (`${a}` -> `${b}` -> literal) are followed at most this many times.
const MAX_RESOLUTION_DEPTH: usize = 8;

/// Name to literal map built once from a resolved descriptor.
///
/// Resolution is a pure lookup: it never mutates declarations, and an
/// unknown reference resolves to itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTable {
    entries: HashMap<String, String>,
}

impl PropertyTable {
    pub fn from_document(doc: &PomDocument) -> Self {
        let mut entries = doc.properties.clone();

        // Implicit project properties do not appear under <properties>.
        let parent_version = doc.parent.as_ref().and_then(|p| p.version.clone());
        let implicit = [
            ("project.version", doc.version.clone().or(parent_version.clone())),
            (
                "project.groupId",
                doc.group_id
                    .clone()
                    .or(doc.parent.as_ref().and_then(|p| p.group_id.clone())),
            ),
            ("project.artifactId", doc.artifact_id.clone()),
            ("project.parent.version", parent_version),
        ];
        for (name, value) in implicit {
            if let Some(value) = value {
                entries.entry(name.to_string()).or_insert(value);
            }
        }

        Self { entries }
    }

    /// Literal value of a `${name}` reference, `None` if the token is not a
    /// reference or is not in the table.
    pub fn lookup(&self, token: &str) -> Option<&str> {
        let mut current = token;
        let mut resolved = None;
        for _ in 0..MAX_RESOLUTION_DEPTH {
            let Some(name) = property_name(current) else {
                break;
            };
            let Some(value) = self.entries.get(name) else {
                break;
            };
            resolved = Some(value.as_str());
            current = value.as_str();
        }
        resolved.filter(|v| property_name(v).is_none())
    }

    /// Resolves a token, falling back to the token itself.
    pub fn resolve<'a>(&'a self, token: &'a str) -> Cow<'a, str> {
        self.lookup(token)
            .map_or(Cow::Borrowed(token), Cow::Borrowed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for PropertyTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
