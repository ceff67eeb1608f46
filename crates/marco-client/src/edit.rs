//! In-place edits of POM text.
//!
//! Edits splice new text into the original document at byte offsets recorded
//! by the parser, so formatting and comments elsewhere survive untouched.

use marco_core::PomDependency;
use quick_xml::escape::escape;
use std::ops::Range;

const DEFAULT_INDENT: &str = "  ";

/// Replacement of one byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Range<usize>,
    pub text: String,
}

/// `<version replaced_value="OLD">RANGE</version>`, `unknown` standing in for an empty old value.
pub fn replaced_version(range: &str, old: &str) -> String {
    let old = if old.is_empty() { "unknown" } else { old };
    format!(
        "<version replaced_value=\"{}\">{}</version>",
        escape(old),
        escape(range)
    )
}

/// Applies non-overlapping edits, last offset first so earlier spans stay valid.
pub fn apply(content: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.span.start.cmp(&a.span.start));
    let mut out = content.to_string();
    for edit in edits {
        out.replace_range(edit.span, &edit.text);
    }
    out
}

/// Appends `deps` to the list closed by the `</dependencies>` tag at `close`.
///
/// Inserted entries carry `<version inserted="true">` and follow the
/// indentation of the closing tag.
pub fn insert_dependencies(content: &str, close: usize, deps: &[PomDependency]) -> String {
    let line_start = content[..close].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &content[line_start..close];

    let (at, indent, lead) = if prefix.trim().is_empty() {
        (line_start, prefix, "")
    } else {
        // `</dependencies>` shares its line with other content.
        (close, "", "\n")
    };
    let unit = if indent.is_empty() { DEFAULT_INDENT } else { indent };

    let mut block = String::from(lead);
    for dep in deps {
        block.push_str(&render_dependency(dep, &format!("{indent}{unit}"), unit));
    }

    let mut out = String::with_capacity(content.len() + block.len());
    out.push_str(&content[..at]);
    out.push_str(&block);
    out.push_str(&content[at..]);
    out
}

fn render_dependency(dep: &PomDependency, indent: &str, unit: &str) -> String {
    let inner = format!("{indent}{unit}");
    let mut xml = format!("{indent}<dependency>\n");
    xml.push_str(&format!("{inner}<groupId>{}</groupId>\n", escape(dep.group_id.as_str())));
    xml.push_str(&format!(
        "{inner}<artifactId>{}</artifactId>\n",
        escape(dep.artifact_id.as_str())
    ));
    if let Some(version) = &dep.version {
        xml.push_str(&format!(
            "{inner}<version inserted=\"true\">{}</version>\n",
            escape(version.as_str())
        ));
    }
    if let Some(typ) = &dep.typ {
        xml.push_str(&format!("{inner}<type>{}</type>\n", escape(typ.as_str())));
    }
    if let Some(scope) = &dep.scope_text {
        xml.push_str(&format!("{inner}<scope>{}</scope>\n", escape(scope.as_str())));
    }
    xml.push_str(&format!("{indent}</dependency>\n"));
    xml
}
