//! Docblock-style annotations (`@name value`) attached to entities and properties.

use smol_str::SmolStr;

/// A single annotation tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Tag name (without `@` prefix).
    pub name: SmolStr,
    /// Tag value, if the tag carries one.
    pub value: Option<String>,
}

impl Annotation {
    /// Create a flag annotation with no value.
    pub fn flag(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Create an annotation with a value.
    pub fn with_value(name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Check if this annotation has the given name.
    pub fn is(&self, name: &str) -> bool {
        self.name.as_str() == name
    }

    /// Get the value as a string slice.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Parse annotation tags from a docblock or a single-line tag list.
///
/// Comment decoration (`/**`, `*`, `*/`) is stripped. A tag starts with `@`
/// at the beginning of the text or after whitespace and runs until the next
/// tag; everything after the tag name is its value.
///
/// ```rust
/// use docmap_schema::attribute::parse_annotations;
///
/// let tags = parse_annotations("@id @dbFieldType \\MongoDB\\BSON\\ObjectId");
/// assert_eq!(tags.len(), 2);
/// assert!(tags[0].is("id"));
/// assert_eq!(tags[1].value(), Some("\\MongoDB\\BSON\\ObjectId"));
/// ```
pub fn parse_annotations(source: &str) -> Vec<Annotation> {
    let text = strip_comment_decoration(source);
    let mut annotations = Vec::new();
    let mut current: Option<(String, String)> = None;

    for word in text.split_whitespace() {
        if let Some(name) = word.strip_prefix('@').filter(|n| !n.is_empty()) {
            if let Some((name, value)) = current.take() {
                annotations.push(finish(name, value));
            }
            current = Some((name.to_string(), String::new()));
        } else if let Some((_, value)) = current.as_mut() {
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(word);
        }
    }

    if let Some((name, value)) = current {
        annotations.push(finish(name, value));
    }

    annotations
}

fn finish(name: String, value: String) -> Annotation {
    if value.is_empty() {
        Annotation::flag(name)
    } else {
        Annotation::with_value(name, value)
    }
}

fn strip_comment_decoration(source: &str) -> String {
    source
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix("/**").unwrap_or(line);
            let line = line.strip_suffix("*/").unwrap_or(line);
            line.trim_start_matches('*').trim()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_flags_and_values() {
        let tags = parse_annotations("@dbSkip @dbFieldName user_id @ignore");
        assert_eq!(
            tags,
            vec![
                Annotation::flag("dbSkip"),
                Annotation::with_value("dbFieldName", "user_id"),
                Annotation::flag("ignore"),
            ]
        );
    }

    #[test]
    fn test_parse_docblock() {
        let source = r#"
            /**
             * Author of the post
             * @var \MongoDB\BSON\ObjectId
             * @dbFieldName author_id
             */
        "#;
        let tags = parse_annotations(source);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].value(), Some("\\MongoDB\\BSON\\ObjectId"));
        assert_eq!(tags[1].value(), Some("author_id"));
    }

    #[test]
    fn test_email_like_words_are_not_tags() {
        let tags = parse_annotations("@dbCollection user@archive");
        assert_eq!(tags, vec![Annotation::with_value("dbCollection", "user@archive")]);
    }

    #[test]
    fn test_empty_source() {
        assert!(parse_annotations("").is_empty());
        assert!(parse_annotations("plain description").is_empty());
    }
}
