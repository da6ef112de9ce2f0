//! Composite resource identifier encoding and decoding.
//!
//! Remote resources are addressed by an ordered sequence of string
//! components folded into a single opaque identifier. Two encodings are
//! supported and both remain decodable indefinitely, since identifiers
//! persisted by older releases are never migrated.

use thiserror::Error;

/// Encoding used to fold identifier components into one opaque string.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdScheme {
    /// Components joined with a delimiter that is absent from the component
    /// alphabet of the identifier kind.
    Delimited(char),
    /// Leading components concatenated at declared fixed byte widths, with
    /// the final component taking the remainder of the string.
    FixedPrefix(&'static [usize]),
}

impl IdScheme {
    /// Encodes `parts` into a single identifier string.
    ///
    /// Components are opaque and are not normalised.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::EmptyComponent`] for an empty component,
    /// [`IdentifierError::DelimiterCollision`] when a component contains the
    /// delimiter, [`IdentifierError::WidthMismatch`] when a fixed-width
    /// component has the wrong length, and
    /// [`IdentifierError::ComponentCount`] when the number of parts does not
    /// match a fixed-width scheme.
    pub fn encode<S: AsRef<str>>(&self, parts: &[S]) -> Result<String, IdentifierError> {
        match *self {
            Self::Delimited(delimiter) => encode_delimited(parts, delimiter),
            Self::FixedPrefix(widths) => encode_fixed_prefix(parts, widths),
        }
    }

    /// Decodes `id` into exactly `expected_count` components.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::ComponentCount`] when the decoded component
    /// count differs from `expected_count`,
    /// [`IdentifierError::EmptyComponent`] when any component is empty, and
    /// [`IdentifierError::Truncated`] when a fixed-width identifier is
    /// shorter than its declared prefix.
    pub fn decode(&self, id: &str, expected_count: usize) -> Result<Vec<String>, IdentifierError> {
        match *self {
            Self::Delimited(delimiter) => decode_delimited(id, delimiter, expected_count),
            Self::FixedPrefix(widths) => decode_fixed_prefix(id, widths, expected_count),
        }
    }
}

/// Failures while encoding or decoding a composite identifier.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum IdentifierError {
    /// Raised when the component count differs from the expected count.
    #[error("identifier '{id}' has {found} components, expected {expected}")]
    ComponentCount {
        /// Identifier (or would-be identifier) involved.
        id: String,
        /// Component count required by the caller or scheme.
        expected: usize,
        /// Component count actually present.
        found: usize,
    },
    /// Raised when a component is empty.
    #[error("identifier '{id}' contains an empty component")]
    EmptyComponent {
        /// Identifier (or would-be identifier) involved.
        id: String,
    },
    /// Raised when a component to encode contains the scheme delimiter.
    #[error("component '{component}' contains reserved delimiter '{delimiter}'")]
    DelimiterCollision {
        /// Offending component.
        component: String,
        /// Delimiter of the scheme.
        delimiter: char,
    },
    /// Raised when a component does not match its declared fixed width.
    #[error("component '{component}' is {found} bytes, declared width is {expected}")]
    WidthMismatch {
        /// Offending component.
        component: String,
        /// Declared byte width.
        expected: usize,
        /// Actual byte length.
        found: usize,
    },
    /// Raised when an identifier is shorter than its declared fixed-width
    /// prefix.
    #[error("identifier '{id}' is shorter than its declared fixed-width prefix")]
    Truncated {
        /// Identifier being decoded.
        id: String,
    },
}

fn encode_delimited<S: AsRef<str>>(parts: &[S], delimiter: char) -> Result<String, IdentifierError> {
    let id = parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&delimiter.to_string());
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            return Err(IdentifierError::EmptyComponent { id });
        }
        if part.contains(delimiter) {
            return Err(IdentifierError::DelimiterCollision {
                component: part.to_owned(),
                delimiter,
            });
        }
    }
    Ok(id)
}

fn decode_delimited(
    id: &str,
    delimiter: char,
    expected_count: usize,
) -> Result<Vec<String>, IdentifierError> {
    let parts: Vec<&str> = id.split(delimiter).collect();
    if parts.len() != expected_count {
        return Err(IdentifierError::ComponentCount {
            id: id.to_owned(),
            expected: expected_count,
            found: parts.len(),
        });
    }
    if parts.iter().any(|part| part.is_empty()) {
        return Err(IdentifierError::EmptyComponent { id: id.to_owned() });
    }
    Ok(parts.into_iter().map(str::to_owned).collect())
}

fn encode_fixed_prefix<S: AsRef<str>>(
    parts: &[S],
    widths: &[usize],
) -> Result<String, IdentifierError> {
    let id: String = parts.iter().map(AsRef::as_ref).collect();
    let declared = widths.len().saturating_add(1);
    if parts.len() != declared {
        return Err(IdentifierError::ComponentCount {
            id,
            expected: declared,
            found: parts.len(),
        });
    }
    for (part, width) in parts.iter().zip(widths) {
        let part = part.as_ref();
        if part.len() != *width {
            return Err(IdentifierError::WidthMismatch {
                component: part.to_owned(),
                expected: *width,
                found: part.len(),
            });
        }
    }
    if parts.iter().any(|part| part.as_ref().is_empty()) {
        return Err(IdentifierError::EmptyComponent { id });
    }
    Ok(id)
}

fn decode_fixed_prefix(
    id: &str,
    widths: &[usize],
    expected_count: usize,
) -> Result<Vec<String>, IdentifierError> {
    let declared = widths.len().saturating_add(1);
    if expected_count != declared {
        return Err(IdentifierError::ComponentCount {
            id: id.to_owned(),
            expected: expected_count,
            found: declared,
        });
    }
    let mut parts = Vec::with_capacity(declared);
    let mut offset = 0usize;
    for width in widths {
        let end = offset.saturating_add(*width);
        let Some(part) = id.get(offset..end) else {
            return Err(IdentifierError::Truncated { id: id.to_owned() });
        };
        parts.push(part.to_owned());
        offset = end;
    }
    let Some(rest) = id.get(offset..) else {
        return Err(IdentifierError::Truncated { id: id.to_owned() });
    };
    if rest.is_empty() || parts.iter().any(String::is_empty) {
        return Err(IdentifierError::EmptyComponent { id: id.to_owned() });
    }
    parts.push(rest.to_owned());
    Ok(parts)
}
