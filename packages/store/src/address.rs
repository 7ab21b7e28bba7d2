//! Dotted key paths used to address cells and callbacks.
//!
//! Every scope carries a key such as `root.list.3.title`. A scoped cell lives
//! at `<scope key>.<index>`, where the index counts registrations under that
//! key within one pass. Global cells live at an explicit key verbatim.

/// Key of the root scope.
pub const ROOT_KEY: &str = "root";

/// Separator between key components.
pub const SEPARATOR: char = '.';

/// Key of a child scope: `parent.child`.
pub fn child(parent: &str, key: impl std::fmt::Display) -> String {
    format!("{}{}{}", parent, SEPARATOR, key)
}

/// Address of the `index`-th registration under `base`.
pub fn indexed(base: &str, index: usize) -> String {
    format!("{}{}{}", base, SEPARATOR, index)
}

/// Split a callback id (`<scope key>.<ordinal>`) into its scope key and
/// ordinal.
///
/// Returns `None` if the id has no numeric ordinal.
pub fn split_ordinal(id: &str) -> Option<(&str, usize)> {
    let (key, ordinal) = id.rsplit_once(SEPARATOR)?;
    let ordinal = ordinal.parse().ok()?;
    Some((key, ordinal))
}

/// Strip the scope prefix from an address.
///
/// Addresses outside the scope (global cells) are returned unchanged.
pub fn scoped<'a>(address: &'a str, scope_key: &str) -> &'a str {
    address
        .strip_prefix(scope_key)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .unwrap_or(address)
}
