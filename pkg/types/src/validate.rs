use anyhow::{Context, Result, bail};

/// Validate a DNS-1123 label, the format of object names and namespaces.
/// Rules: lowercase `[a-z0-9-]`, max 63 chars, no leading/trailing hyphens.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if name.len() > 63 {
        bail!("name '{}' exceeds 63 characters (got {})", name, name.len());
    }
    if name.starts_with('-') || name.ends_with('-') {
        bail!("name '{}' must not start or end with a hyphen", name);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        bail!(
            "name '{}' must contain only lowercase letters, digits, and hyphens [a-z0-9-]",
            name
        );
    }
    Ok(())
}

/// Validate both halves of a `(name, namespace)` object key.
pub fn validate_object_key(name: &str, namespace: &str) -> Result<()> {
    validate_name(name).context("invalid object name")?;
    validate_name(namespace).context("invalid namespace")?;
    Ok(())
}
