// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Instance naming.
//!
//! Turns caller-supplied sale IDs into platform-safe container app names and
//! back. The same derivation is used to create and to delete an instance, so a
//! caller can always address what it created.

/// Tag every managed instance name starts with.
pub const NAMESPACE_PREFIX: &str = "market-";

/// Version reported when an image reference carries no tag.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Derive the canonical instance name for a logical sale ID.
///
/// Lower-cases the input, turns whitespace into `-`, drops every remaining
/// character outside `[a-z0-9-]` and prefixes [`NAMESPACE_PREFIX`]. Never
/// fails: an ID made only of symbols yields the bare prefix.
pub fn derive_name(logical_id: &str) -> String {
    let safe: String = logical_id
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    format!("{NAMESPACE_PREFIX}{safe}")
}

/// Recover a logical ID from a canonical name by stripping the namespace tag.
///
/// Returns `None` for names this system does not manage.
pub fn logical_id_from_name(canonical_name: &str) -> Option<&str> {
    canonical_name.strip_prefix(NAMESPACE_PREFIX)
}

/// Version tag of an image reference: the part after the last `:`.
///
/// `acr.azurecr.io/engine:v20260213-111039` gives `v20260213-111039`.
pub fn image_version(image_ref: &str) -> String {
    match image_ref.rsplit(':').next() {
        Some(tag) if !tag.is_empty() => tag.to_string(),
        _ => UNKNOWN_VERSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_name_normalizes() {
        assert_eq!(derive_name("Flash Sale #1"), "market-flash-sale-1");
        assert_eq!(derive_name("flash-sale-1"), "market-flash-sale-1");
        assert_eq!(derive_name("ABC_def.42"), "market-abcdef42");
    }

    #[test]
    fn test_derive_name_degenerate_input() {
        assert_eq!(derive_name(""), "market-");
        assert_eq!(derive_name("#!?"), "market-");
        assert_eq!(derive_name("été"), "market-t");
        assert_eq!(derive_name("  "), "market---");
    }

    #[test]
    fn test_logical_id_round_trip() {
        let name = derive_name("flash-sale-1");
        assert_eq!(logical_id_from_name(&name), Some("flash-sale-1"));
        assert_eq!(logical_id_from_name("other-app"), None);
    }

    #[test]
    fn test_image_version() {
        assert_eq!(
            image_version("acrarcal.azurecr.io/engine:v20260213-111039"),
            "v20260213-111039"
        );
        assert_eq!(image_version("localhost:5000/engine:1.2"), "1.2");
        assert_eq!(image_version(""), "unknown");
        assert_eq!(image_version("engine:"), "unknown");
        assert_eq!(image_version("engine"), "engine");
    }
}
