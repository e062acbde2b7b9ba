// Copyright (C) 2026 Skydock Contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deterministic container-name derivation.
//!
//! Names must satisfy the platform constraints: lowercase alphanumeric plus
//! inner hyphens, no leading/trailing hyphen, at most 50 characters (leaving
//! room for platform-added suffixes). Derivation is a pure function of
//! `(client_id, project_id)` so repeated deploys of the same project always
//! address the same deployment.

use crate::error::{CoreError, Result};

/// Maximum generated name length, leaving headroom below the platform's
/// 63-character limit for provider-added suffixes.
pub const MAX_NAME_LEN: usize = 50;

const CLIENT_PREFIX_LEN: usize = 6;
const PROJECT_PREFIX_LEN: usize = 8;

/// Derive the container name for a `(client_id, project_id)` pair.
///
/// Strips non-alphanumerics from both identifiers, truncates them to short
/// prefixes, joins them under a literal `app-` prefix, lowercases the result
/// and trims it to the platform constraints. Fails fast with
/// [`CoreError::InvalidContainerName`] before any provider call is made.
pub fn container_name(client_id: &str, project_id: &str) -> Result<String> {
    let client_short = alnum_prefix(client_id, CLIENT_PREFIX_LEN);
    let project_short = alnum_prefix(project_id, PROJECT_PREFIX_LEN);

    let base = format!("app-{}-{}", client_short, project_short).to_lowercase();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();

    let name: String = cleaned
        .trim_matches('-')
        .chars()
        .take(MAX_NAME_LEN)
        .collect();
    let name = name.trim_end_matches('-').to_string();

    validate(&name)?;
    Ok(name)
}

/// Check a name against `^[a-z0-9][a-z0-9-]{0,49}$` with no trailing hyphen.
pub fn validate(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidContainerName(name.to_string()))
    }
}

fn alnum_prefix(s: &str, len: usize) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).take(len).collect()
}
