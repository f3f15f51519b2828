//! Replica naming
//!
//! A replica of root `<namespace>/<name>` is stored as `<name>-<namespace>`
//! inside each target cluster namespace. Root namespaces are restricted to
//! hyphen-free DNS labels so the namespace is always the text after the last
//! hyphen, which keeps the mapping injective across roots.

use crate::ids::ObjectKey;

const MAX_NAMESPACE_LEN: usize = 63;
const MAX_NAME_LEN: usize = 253;

/// Errors deriving a replica name from a root identity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("root namespace {0:?} must be 1-63 lowercase alphanumeric characters without hyphens")]
    InvalidNamespace(String),

    #[error("root name {0:?} must be a lowercase DNS subdomain")]
    InvalidName(String),

    #[error("replica name for {0} exceeds 253 characters")]
    TooLong(ObjectKey),
}

/// Deterministic replica name for a root policy
pub fn full_name_for_policy(root: &ObjectKey) -> Result<String, NameError> {
    validate_root_namespace(&root.namespace)?;
    validate_root_name(&root.name)?;

    let full_name = format!("{}-{}", root.name, root.namespace);
    if full_name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong(root.clone()));
    }
    Ok(full_name)
}

fn validate_root_namespace(namespace: &str) -> Result<(), NameError> {
    let valid = !namespace.is_empty()
        && namespace.len() <= MAX_NAMESPACE_LEN
        && namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(NameError::InvalidNamespace(namespace.to_string()))
    }
}

fn validate_root_name(name: &str) -> Result<(), NameError> {
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let valid = name.starts_with(alnum)
        && name.ends_with(alnum)
        && name.chars().all(|c| alnum(c) || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(NameError::InvalidName(name.to_string()))
    }
}
