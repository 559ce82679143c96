//! Dotted version comparison used to decide whether a release is an update.

/// Returns true when `incoming` is newer than `current`.
///
/// Components are compared left to right over the components of `incoming`
/// only. Anything that does not parse as an integer counts as `0`, as does a
/// component missing from `current`. So `"1.2"` is not newer than `"1.2.3"`,
/// while `"1.2.1"` is newer than `"1.2"`.
pub fn is_newer(current: &str, incoming: &str) -> bool {
    let current_parts: Vec<&str> = strip_prefix(current).split('.').collect();

    for (i, part) in strip_prefix(incoming).split('.').enumerate() {
        let a = coerce(part);
        let b = current_parts.get(i).map_or(0, |p| coerce(p));
        if a > b {
            return true;
        }
        if a < b {
            return false;
        }
    }
    false
}

fn strip_prefix(version: &str) -> &str {
    let version = version.trim();
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

fn coerce(component: &str) -> i64 {
    component.trim().parse::<i64>().unwrap_or(0)
}
