//! pom.xml reader with byte-accurate span tracking.
//!
//! Uses the quick-xml SAX reader. Every `<dependency>` element is collected
//! together with the byte span of its `<version>` element so callers can
//! rewrite versions in the original text without reformatting the file.

use crate::error::{MarcoError, Result};
use crate::gav::{Gav, MavenScope};
use crate::properties::PropertyTable;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::ops::Range;

/// Where a `<dependency>` element was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySection {
    /// Top-level `<project><dependencies>`.
    Dependencies,
    DependencyManagement,
    Plugin,
    /// Profiles and other nested dependency lists.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    /// Raw `<version>` text, possibly a `${property}` reference.
    pub version: Option<String>,
    pub scope: MavenScope,
    /// Raw `<scope>` text, `None` when the element is absent.
    pub scope_text: Option<String>,
    pub typ: Option<String>,
    pub section: DependencySection,
    /// Byte span of the whole `<version>...</version>` element.
    pub version_span: Option<Range<usize>>,
}

impl PomDependency {
    /// "{groupId}:{artifactId}"
    pub fn name(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Structural identity used when rewriting: group, artifact and raw version text.
    pub fn same_declaration(&self, other: &Self) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.version == other.version
    }

    pub fn is_import(&self) -> bool {
        self.typ.as_deref() == Some("pom") && self.scope == MavenScope::Import
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentRef {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PomDocument {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: HashMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    /// Byte offset of the top-level `</dependencies>` tag.
    pub dependencies_close: Option<usize>,
}

impl PomDocument {
    /// Parent coordinate with its version resolved through `properties`.
    ///
    /// A parent missing any of groupId/artifactId/version is malformed and ignored.
    pub fn parent_gav(&self, properties: &PropertyTable) -> Option<Gav> {
        let parent = self.parent.as_ref()?;
        let (Some(g), Some(a), Some(v)) = (
            parent.group_id.as_deref(),
            parent.artifact_id.as_deref(),
            parent.version.as_deref(),
        ) else {
            return None;
        };
        Some(Gav::new(g, a, properties.resolve(v)))
    }

    /// `dependencyManagement` entries with `<type>pom</type><scope>import</scope>`.
    pub fn import_gavs(&self, properties: &PropertyTable) -> Vec<Gav> {
        self.dependencies
            .iter()
            .filter(|d| d.section == DependencySection::DependencyManagement && d.is_import())
            .filter_map(|d| {
                let version = d.version.as_deref().filter(|v| !v.is_empty())?;
                Some(Gav::import(
                    d.group_id.as_str(),
                    d.artifact_id.as_str(),
                    properties.resolve(version),
                ))
            })
            .collect()
    }

    /// Top-level dependencies only.
    pub fn declared(&self) -> impl Iterator<Item = &PomDependency> {
        self.dependencies
            .iter()
            .filter(|d| d.section == DependencySection::Dependencies)
    }
}

/// Accumulator for a single dependency being parsed.
#[derive(Default)]
struct DepAccum {
    depth: usize,
    section: Option<DependencySection>,
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    version_span: Option<Range<usize>>,
    scope: Option<String>,
    typ: Option<String>,
}

impl DepAccum {
    fn finalize(self) -> Option<PomDependency> {
        let group_id = self.group_id?;
        let artifact_id = self.artifact_id?;
        Some(PomDependency {
            group_id,
            artifact_id,
            version: self.version,
            scope: MavenScope::parse_or_default(self.scope.as_deref()),
            scope_text: self.scope,
            typ: self.typ,
            section: self.section.unwrap_or(DependencySection::Other),
            version_span: self.version_span,
        })
    }
}

fn section_for(stack: &[String]) -> DependencySection {
    if stack.iter().any(|t| t == "dependencyManagement") {
        DependencySection::DependencyManagement
    } else if stack.iter().any(|t| t == "plugin") {
        DependencySection::Plugin
    } else if stack.len() <= 2 {
        DependencySection::Dependencies
    } else {
        DependencySection::Other
    }
}

/// Parses pom.xml content.
///
/// Also accepts a bare `<dependencies>` fragment, whose entries are reported
/// as [`DependencySection::Dependencies`].
pub fn parse_pom(content: &str) -> Result<PomDocument> {
    let mut doc = PomDocument::default();
    let mut reader = Reader::from_str(content);
    // Whitespace stays as text events so buffer positions land on tag starts.
    reader.config_mut().trim_text(false);

    let mut stack: Vec<String> = Vec::new();
    let mut current_dep: Option<DepAccum> = None;
    let mut text = String::new();
    let mut element_start = 0usize;

    loop {
        let pos = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| MarcoError::xml("pom.xml", e))?;

        match event {
            Event::Start(ref e) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                element_start = tag_start(content, pos);
                if tag == "dependency" && stack.last().is_some_and(|t| t == "dependencies") {
                    current_dep = Some(DepAccum {
                        depth: stack.len() + 1,
                        section: Some(section_for(&stack)),
                        ..DepAccum::default()
                    });
                }
                stack.push(tag);
                text.clear();
            }
            Event::Empty(ref e) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                let start = tag_start(content, pos);
                let end = reader.buffer_position() as usize;
                stack.push(tag);
                record_leaf(&mut doc, &stack, current_dep.as_mut(), "", start..end);
                stack.pop();
            }
            Event::Text(ref e) => match e.decode() {
                Ok(cow) => text.push_str(&cow),
                Err(_) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            },
            Event::CData(ref e) => text.push_str(&String::from_utf8_lossy(e)),
            Event::GeneralRef(ref e) => {
                let name = String::from_utf8_lossy(e).to_string();
                if let Some(c) = resolve_entity(&name) {
                    text.push(c);
                }
            }
            Event::End(_) => {
                let end = reader.buffer_position() as usize;
                let value = text.trim().to_string();

                if stack.len() == 2
                    && stack[0] == "project"
                    && stack[1] == "dependencies"
                {
                    doc.dependencies_close = Some(tag_start(content, pos));
                }

                let closes_dependency = current_dep
                    .as_ref()
                    .is_some_and(|dep| stack.len() == dep.depth);

                if closes_dependency {
                    if let Some(dep) = current_dep.take().and_then(DepAccum::finalize) {
                        doc.dependencies.push(dep);
                    }
                } else {
                    record_leaf(
                        &mut doc,
                        &stack,
                        current_dep.as_mut(),
                        &value,
                        element_start..end,
                    );
                }

                stack.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(doc)
}

/// Stores the text of a just-closed element if it is one we track.
fn record_leaf(
    doc: &mut PomDocument,
    stack: &[String],
    dep: Option<&mut DepAccum>,
    value: &str,
    span: Range<usize>,
) {
    if let Some(dep) = dep {
        // Only direct children of <dependency>; <exclusions> also carry groupId/artifactId.
        if stack.len() == dep.depth + 1 {
            let field = stack.last().map(String::as_str).unwrap_or_default();
            let value = value.to_string();
            match field {
                "groupId" => dep.group_id = Some(value),
                "artifactId" => dep.artifact_id = Some(value),
                "version" => {
                    dep.version = Some(value);
                    dep.version_span = Some(span);
                }
                "scope" => dep.scope = Some(value),
                "type" => dep.typ = Some(value),
                _ => {}
            }
        }
        return;
    }

    let path: Vec<&str> = stack.iter().map(String::as_str).collect();
    match path.as_slice() {
        ["project", "groupId"] => doc.group_id = Some(value.to_string()),
        ["project", "artifactId"] => doc.artifact_id = Some(value.to_string()),
        ["project", "version"] => doc.version = Some(value.to_string()),
        ["project", "parent", field] => {
            let parent = doc.parent.get_or_insert_with(ParentRef::default);
            match *field {
                "groupId" => parent.group_id = Some(value.to_string()),
                "artifactId" => parent.artifact_id = Some(value.to_string()),
                "version" => parent.version = Some(value.to_string()),
                _ => {}
            }
        }
        ["project", "properties", key] => {
            doc.properties.insert((*key).to_string(), value.to_string());
        }
        _ => {}
    }
}

/// Position of the `<` that opens the element read from `pos`.
fn tag_start(content: &str, pos: usize) -> usize {
    let pos = pos.min(content.len());
    content[pos..].find('<').map_or(pos, |rel| pos + rel)
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Strips build-tool chatter around generated XML: keeps the content between
/// the first `<` and the last `>`.
pub fn extract_xml(raw: &str) -> &str {
    match (raw.find('<'), raw.rfind('>')) {
        (Some(start), Some(end)) if start <= end => &raw[start..=end],
        _ => "",
    }
}
