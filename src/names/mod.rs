//! Type name handling: parsing C++ spellings, normalization and mangling.
pub mod mangle;
pub mod normalize;
pub mod spelling;

pub use mangle::mangle;
pub use normalize::{DefaultsPolicy, Normalizer};
pub use spelling::TypeSpelling;

/// Standard-library class templates that are spelled without a leading `::`.
const STD_CLASSES: &[&str] = &[
    "vector", "list", "deque", "forward_list", "map", "multimap", "set", "multiset",
    "unordered_map", "unordered_multimap", "unordered_set", "unordered_multiset",
    "bitset", "string", "basic_string", "pair", "complex", "array", "valarray",
];

/// Split a qualified name on the `::` separators that are not nested inside
/// template arguments.
pub fn scope_segments(name: &str) -> Vec<String> {
    let name = name.trim().trim_start_matches("::");
    let bytes = name.as_bytes();
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                out.push(name[start..i].trim().to_owned());
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    out.push(name[start..].trim().to_owned());
    out
}

/// Name-based check for standard-library classes.
pub fn is_std_class(name: &str) -> bool {
    let segments = scope_segments(name);
    let leaf = match segments.as_slice() {
        [leaf] => leaf,
        [std, leaf] if std == "std" => leaf,
        _ => return false,
    };
    let ident = leaf.split('<').next().unwrap_or_default().trim();
    STD_CLASSES.contains(&ident)
}
