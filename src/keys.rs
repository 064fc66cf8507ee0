use std::fmt;

/// The character separating the components of every composite key.
///
/// Because the store only sees the concatenated form, no key component may
/// contain this character: `decode` and the period prefix query would otherwise
/// split at the wrong position and silently attribute records to the wrong
/// tenant, student, or course. The constructors below enforce that rule.
pub const KEY_SEPARATOR: char = '#';

/// KeyError
///
/// Rejection reason produced by the composite-key constructors. Always maps to
/// a 400 response: the offending value came straight from the request body (or,
/// for listings, from the caller's validated claims).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The component was absent or the empty string.
    Empty { field: &'static str },
    /// The component contained the reserved separator character.
    SeparatorNotAllowed { field: &'static str },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::Empty { field } => {
                write!(f, "Missing required field: {field}.")
            }
            KeyError::SeparatorNotAllowed { field } => {
                write!(
                    f,
                    "Field {field} must not contain the '{KEY_SEPARATOR}' character."
                )
            }
        }
    }
}

impl std::error::Error for KeyError {}

/// Validates a single key component before it is joined into a composite key.
fn check_component(field: &'static str, value: &str) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::Empty { field });
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(KeyError::SeparatorNotAllowed { field });
    }
    Ok(())
}

/// PartitionKey
///
/// The primary grouping key of the grades table: `tenant_id#user_id`. Groups
/// every record belonging to one student within one tenant. The same key shape
/// addresses the users table for the enrollment existence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn new(tenant_id: &str, user_id: &str) -> Result<Self, KeyError> {
        check_component("tenant_id", tenant_id)?;
        check_component("user_id", user_id)?;
        Ok(Self(format!("{tenant_id}{KEY_SEPARATOR}{user_id}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// SortKey
///
/// The secondary key within a partition: `periodo#curso_id`. Exact-match
/// lookups use the full key; period listings match on the encoded prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey(String);

impl SortKey {
    pub fn new(periodo: &str, curso_id: &str) -> Result<Self, KeyError> {
        check_component("periodo", periodo)?;
        check_component("curso_id", curso_id)?;
        Ok(Self(format!("{periodo}{KEY_SEPARATOR}{curso_id}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits a raw sort key back into `(periodo, curso_id)` at the FIRST
    /// separator occurrence. Returns `None` for a key with no separator, which
    /// can only happen for items written outside this service.
    pub fn decode(raw: &str) -> Option<(&str, &str)> {
        raw.split_once(KEY_SEPARATOR)
    }
}

/// PeriodPrefix
///
/// The `begins_with` operand for period listings: `periodo#`. The trailing
/// separator is part of the prefix so that periodo "2024-1" never matches a
/// sort key written for periodo "2024-10".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodPrefix(String);

impl PeriodPrefix {
    pub fn new(periodo: &str) -> Result<Self, KeyError> {
        check_component("periodo", periodo)?;
        Ok(Self(format!("{periodo}{KEY_SEPARATOR}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// GradeKey
///
/// The full composite identity of one grade record. At most one record exists
/// per key; writes with an existing key overwrite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeKey {
    pub partition: PartitionKey,
    pub sort: SortKey,
}

impl GradeKey {
    pub fn new(
        tenant_id: &str,
        user_id: &str,
        periodo: &str,
        curso_id: &str,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            partition: PartitionKey::new(tenant_id, user_id)?,
            sort: SortKey::new(periodo, curso_id)?,
        })
    }
}
