//! Compound identifier algebra
//!
//! Nodes are addressed by `;`-delimited identifiers. A *field path* names a
//! declared field (`group;item`); an *instance identifier* carries a numeric
//! index after every segment whose field is multiple (`group;1;item;0`).
//!
//! ```text
//! instance:    items;2;entry;0
//! field path:  items;entry
//! last index:  0
//! parent:      items;2
//! ```

use crate::error::{Result, StructuredDataError};

/// Structural delimiter between segments
pub const DELIMITER: char = ';';

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Check that `id` parses as a compound identifier.
pub fn validate(id: &str) -> Result<()> {
    let malformed = || StructuredDataError::MalformedIdentifier(id.to_string());
    if id.is_empty() {
        return Err(malformed());
    }

    let mut previous_was_index = true;
    for segment in id.split(DELIMITER) {
        if segment.is_empty() || segment.contains(':') {
            return Err(malformed());
        }
        let index = is_index(segment);
        if index && previous_was_index {
            // leading index, or two indices in a row
            return Err(malformed());
        }
        if index && segment.parse::<u32>().is_err() {
            return Err(malformed());
        }
        previous_was_index = index;
    }
    Ok(())
}

/// Iterate over the field segments of an identifier, skipping indices.
pub fn field_segments(id: &str) -> impl Iterator<Item = &str> {
    id.split(DELIMITER).filter(|s| !is_index(s))
}

/// Strip every repetition index, yielding the field path.
///
/// Idempotent: a field path maps to itself.
pub fn field_path_of(id: &str) -> Result<String> {
    validate(id)?;
    Ok(field_segments(id).collect::<Vec<_>>().join(";"))
}

/// Trailing repetition index, if any.
pub fn last_index_of(id: &str) -> Result<Option<u32>> {
    validate(id)?;
    Ok(id
        .rsplit_once(DELIMITER)
        .filter(|(_, tail)| is_index(tail))
        .and_then(|(_, tail)| tail.parse().ok()))
}

/// Remove the trailing repetition index, if any.
pub fn strip_last_index(id: &str) -> Result<String> {
    validate(id)?;
    Ok(match id.rsplit_once(DELIMITER) {
        Some((head, tail)) if is_index(tail) => head.to_string(),
        _ => id.to_string(),
    })
}

/// Replace (or append) the trailing repetition index.
pub fn with_index(id: &str, index: u32) -> Result<String> {
    let base = strip_last_index(id)?;
    Ok(format!("{base};{index}"))
}

/// Instance identifier of the enclosing group, `None` for top-level nodes.
pub fn parent_instance_of(id: &str) -> Result<Option<String>> {
    let without_index = strip_last_index(id)?;
    Ok(without_index
        .rsplit_once(DELIMITER)
        .map(|(head, _)| head.to_string()))
}

/// Field path of the enclosing group; empty for top-level fields.
pub fn parent_field_path(field_path: &str) -> &str {
    field_path
        .rsplit_once(DELIMITER)
        .map(|(head, _)| head)
        .unwrap_or("")
}

/// The field's own segment, as it appears on the wire.
pub fn leaf_name(id: &str) -> &str {
    field_segments(id).last().unwrap_or("")
}

/// Append a segment to a (possibly empty) parent identifier.
pub fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}{DELIMITER}{segment}")
    }
}

/// Build an instance identifier from its parent, wire name and index.
pub fn instance_id(parent: &str, name: &str, index: Option<u32>) -> String {
    let id = join(parent, name);
    match index {
        Some(i) => format!("{id}{DELIMITER}{i}"),
        None => id,
    }
}

/// Whether the identifier carries any repetition index.
pub fn has_index(id: &str) -> bool {
    id.split(DELIMITER).any(is_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_of() {
        assert_eq!(field_path_of("group;item;0").unwrap(), "group;item");
        assert_eq!(field_path_of("group;3;item;12").unwrap(), "group;item");
        assert_eq!(field_path_of("single").unwrap(), "single");
    }

    #[test]
    fn test_field_path_idempotent() {
        let once = field_path_of("a;0;b;1;c").unwrap();
        assert_eq!(field_path_of(&once).unwrap(), once);
    }

    #[test]
    fn test_last_index() {
        assert_eq!(last_index_of("a;b;4").unwrap(), Some(4));
        assert_eq!(last_index_of("a;2;b").unwrap(), None);
        assert_eq!(strip_last_index("a;2;b;7").unwrap(), "a;2;b");
        assert_eq!(strip_last_index("a;2;b").unwrap(), "a;2;b");
        assert_eq!(with_index("a;b;0", 5).unwrap(), "a;b;5");
    }

    #[test]
    fn test_parents() {
        assert_eq!(parent_instance_of("items;2;entry;0").unwrap().as_deref(), Some("items;2"));
        assert_eq!(parent_instance_of("items;entry").unwrap().as_deref(), Some("items"));
        assert_eq!(parent_instance_of("items;0").unwrap(), None);
        assert_eq!(parent_field_path("a;b;c"), "a;b");
        assert_eq!(parent_field_path("a"), "");
        assert_eq!(leaf_name("a;1;b;0"), "b");
    }

    #[test]
    fn test_malformed() {
        for bad in ["", ";a", "a;", "a;;b", "0;a", "a;1;2", "a:b", "a;99999999999"] {
            assert!(
                matches!(validate(bad), Err(StructuredDataError::MalformedIdentifier(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_instance_id() {
        assert_eq!(instance_id("", "items", None), "items");
        assert_eq!(instance_id("items", "entry", Some(1)), "items;entry;1");
        assert!(has_index("items;entry;1"));
        assert!(!has_index("items;entry"));
    }
}
