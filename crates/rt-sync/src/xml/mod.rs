//! Storage-format normalization.
//!
//! [`format_storage`] turns whatever Confluence (or a user's editor) produced
//! into one canonical layout, so that two bodies with the same content
//! compare equal byte for byte. Repairs that have exactly one sensible
//! outcome are applied silently:
//!
//! - HTML named entities become Unicode characters
//! - bare `&` is escaped
//! - elements left open are closed at end of input, or when an end tag for
//!   an enclosing element appears
//!
//! An end tag that closes nothing is ambiguous and fails with
//! [`XmlError::UnmatchedEndTag`].

mod entities;
mod format;
mod tree;

use std::fmt::Display;

use quick_xml::reader::Reader;

/// Storage-format body that could not be repaired.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// Tokenizer rejected the input (unterminated tag, bad attribute, ...).
    #[error("malformed XML at byte {position}: {message}")]
    Syntax {
        /// Byte offset of the error.
        position: u64,
        /// Tokenizer message.
        message: String,
    },

    /// End tag without a matching open element.
    #[error("unexpected end tag </{name}> at byte {position}")]
    UnmatchedEndTag {
        /// Tag name.
        name: String,
        /// Byte offset just past the tag.
        position: u64,
    },
}

impl XmlError {
    fn syntax(reader: &Reader<&[u8]>, error: impl Display) -> Self {
        Self::Syntax {
            position: reader.error_position(),
            message: error.to_string(),
        }
    }
}

/// Parse and re-serialize a storage-format fragment canonically.
///
/// The result has no XML declaration, indents block-level structure by two
/// spaces, and ends with a single newline (or is empty for empty input).
/// Formatting is idempotent.
///
/// # Errors
///
/// Returns [`XmlError`] if the fragment cannot be repaired unambiguously.
pub fn format_storage(body: &str) -> Result<String, XmlError> {
    let prepared = entities::prepare(body);
    let nodes = tree::parse_fragment(&prepared)?;
    Ok(format::serialize(&nodes))
}

/// Whether two bodies have the same content once normalized.
///
/// # Errors
///
/// Returns [`XmlError`] if either body cannot be repaired.
pub fn is_equivalent(a: &str, b: &str) -> Result<bool, XmlError> {
    Ok(format_storage(a)? == format_storage(b)?)
}
