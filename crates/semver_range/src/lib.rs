//! npm-style semver range parsing and matching.
//!
//! Atomic version comparison is delegated to the `semver` crate, rather
//! than hand-rolling a parser for a well-known grammar. The range algebra
//! itself (caret/tilde/hyphen/union/intersection) has no crates.io
//! counterpart that speaks npm's dialect, so it's hand-written here as a
//! set of small, single-purpose `try_*` helpers tried in a fixed
//! precedence order, falling through to the next on `None`.

use semver::Version;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty version string")]
    Empty,
    #[error("not a valid semver-ish version: {0}")]
    Invalid(String),
}

/// Parses `v? DIGITS (.DIGITS (.DIGITS)?)? (-prerelease)?`, defaulting
/// missing minor/patch to zero. Returns [`ParseError`] on anything else —
/// callers that want the "unparseable defaults to equal" behavior should
/// use [`compare`], not this function directly.
pub fn parse(v: &str) -> Result<Version, ParseError> {
    let v = v.trim();
    if v.is_empty() {
        return Err(ParseError::Empty);
    }
    let v = v.strip_prefix('v').unwrap_or(v);

    let (core, pre) = match v.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (v, None),
    };
    let mut parts = core.split('.');
    let major = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ParseError::Invalid(v.to_string()))?;
    let minor = parts.next().unwrap_or("0");
    let patch = parts.next().unwrap_or("0");
    if parts.next().is_some() {
        return Err(ParseError::Invalid(v.to_string()));
    }

    let normalized = match pre {
        Some(pre) => format!("{major}.{minor}.{patch}-{pre}"),
        None => format!("{major}.{minor}.{patch}"),
    };
    Version::parse(&normalized).map_err(|_| ParseError::Invalid(v.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Less,
    Equal,
    Greater,
}

/// Compares two version strings. Unparseable input on either side is a
/// conservative no-op: the comparator reports `Equal` rather than failing
/// the whole resolution, treating unknown inputs as incomparable-but-not-fatal.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Ok(a), Ok(b)) => match a.cmp(&b) {
            std::cmp::Ordering::Less => Ordering::Less,
            std::cmp::Ordering::Equal => Ordering::Equal,
            std::cmp::Ordering::Greater => Ordering::Greater,
        },
        _ => Ordering::Equal,
    }
}

fn is_prerelease(v: &Version) -> bool {
    !v.pre.is_empty()
}

/// Picks the highest of a set of candidates, preferring non-prerelease
/// versions — applied generically wherever a candidate set needs a winner.
fn highest_preferring_stable<'a>(candidates: impl Iterator<Item = &'a Version>) -> Option<&'a Version> {
    let candidates: Vec<&Version> = candidates.collect();
    let stable_max = candidates
        .iter()
        .filter(|v| !is_prerelease(v))
        .max()
        .copied();
    stable_max.or_else(|| candidates.into_iter().max())
}

fn try_latest(versions: &[Version], range: &str) -> Option<bool> {
    let trimmed = range.trim();
    if trimmed.is_empty() || trimmed == "*" || trimmed.eq_ignore_ascii_case("latest") {
        Some(!versions.is_empty())
    } else {
        None
    }
}

fn try_union(versions: &[Version], range: &str) -> Option<Version> {
    if !range.contains("||") {
        return None;
    }
    range
        .split("||")
        .filter_map(|part| match_range(versions, part.trim()))
        .max()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Bound {
    major: u64,
    minor: u64,
    patch: u64,
}

fn parse_bound(s: &str) -> Option<(Bound, bool)> {
    let v = parse(s).ok()?;
    Some((
        Bound {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
        },
        is_prerelease(&v),
    ))
}

fn try_caret(versions: &[Version], range: &str) -> Option<Version> {
    let base_str = range.strip_prefix('^')?;
    let base = parse(base_str).ok()?;
    let base_is_pre = is_prerelease(&base);

    let matches = versions.iter().filter(|v| {
        if is_prerelease(v) {
            // Prereleases only satisfy a caret range when the base itself
            // is a prerelease, and then only as an exact match.
            return base_is_pre && **v == base;
        }
        if base_is_pre {
            return false;
        }
        if base.major > 0 {
            v.major == base.major && *v >= base
        } else if base.minor > 0 {
            v.major == 0 && v.minor == base.minor && *v >= base
        } else {
            v.major == 0 && v.minor == 0 && v.patch >= base.patch
        }
    });
    highest_preferring_stable(matches).cloned()
}

fn try_tilde(versions: &[Version], range: &str) -> Option<Version> {
    let base_str = range.strip_prefix('~')?;
    let base = parse(base_str).ok()?;
    let matches = versions
        .iter()
        .filter(|v| !is_prerelease(v) && v.major == base.major && v.minor == base.minor && *v >= base);
    highest_preferring_stable(matches).cloned()
}

fn try_comparator(versions: &[Version], range: &str) -> Option<Version> {
    let range = range.trim();
    let (op, rest) = if let Some(r) = range.strip_prefix(">=") {
        (">=", r)
    } else if let Some(r) = range.strip_prefix("<=") {
        ("<=", r)
    } else if let Some(r) = range.strip_prefix('>') {
        (">", r)
    } else if let Some(r) = range.strip_prefix('<') {
        ("<", r)
    } else {
        return None;
    };
    let base = parse(rest.trim()).ok()?;
    let matches = versions.iter().filter(|v| {
        if is_prerelease(v) {
            return false;
        }
        match op {
            ">=" => **v >= base,
            ">" => **v > base,
            "<=" => **v <= base,
            "<" => **v < base,
            _ => unreachable!(),
        }
    });
    highest_preferring_stable(matches).cloned()
}

fn try_exact(versions: &[Version], range: &str) -> Option<Version> {
    let rest = range.strip_prefix('=')?;
    let base = parse(rest.trim()).ok()?;
    versions.iter().find(|v| **v == base).cloned()
}

fn try_wildcard(versions: &[Version], range: &str) -> Option<Version> {
    let range = range.trim();
    let lower = range.to_ascii_lowercase();
    if lower == "x" {
        return highest_preferring_stable(versions.iter()).cloned();
    }
    if !lower.ends_with(".x") {
        return None;
    }
    let core = &range[..range.len() - ".x".len()];
    let segments: Vec<&str> = core.split('.').collect();
    let major: u64 = match segments.first() {
        Some(s) => s.parse().ok()?,
        None => return highest_preferring_stable(versions.iter()).cloned(),
    };
    let matches = versions.iter().filter(|v| {
        if is_prerelease(v) || v.major != major {
            return false;
        }
        match segments.get(1) {
            Some(minor_s) => minor_s.parse::<u64>().map(|m| v.minor == m).unwrap_or(false),
            None => true,
        }
    });
    highest_preferring_stable(matches).cloned()
}

fn try_hyphen(versions: &[Version], range: &str) -> Option<Version> {
    let (lo_s, hi_s) = split_hyphen_range(range)?;
    let (lo, _) = parse_bound(lo_s.trim())?;
    let (hi, _) = parse_bound(hi_s.trim())?;
    let lo_v = Version::new(lo.major, lo.minor, lo.patch);
    let hi_v = Version::new(hi.major, hi.minor, hi.patch);
    let matches = versions
        .iter()
        .filter(|v| !is_prerelease(v) && **v >= lo_v && **v <= hi_v);
    highest_preferring_stable(matches).cloned()
}

/// Splits `"A - B"` on the hyphen that separates two version bounds,
/// distinguishing it from a hyphen that is part of a prerelease tag (e.g.
/// `1.0.0-beta.1`) by requiring the separator to be surrounded by
/// whitespace.
fn split_hyphen_range(range: &str) -> Option<(&str, &str)> {
    let idx = range.find(" - ")?;
    Some((&range[..idx], &range[idx + 3..]))
}

fn try_intersection(versions: &[Version], range: &str) -> Option<Version> {
    let parts: Vec<&str> = range.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    // Each sub-constraint narrows the candidate pool; the surviving pool's
    // winner (by the same non-prerelease-preferring rule) is the match.
    let mut pool: Vec<Version> = versions.to_vec();
    for part in &parts {
        let satisfied: Vec<Version> = pool
            .iter()
            .filter(|v| satisfies(v, part))
            .cloned()
            .collect();
        pool = satisfied;
        if pool.is_empty() {
            return None;
        }
    }
    highest_preferring_stable(pool.iter()).cloned()
}

/// Whether a single version satisfies a single (non-union, non-space)
/// sub-constraint. Used by [`try_intersection`] to test one version against
/// one piece of a space-separated list without re-running the whole
/// candidate-set machinery.
fn satisfies(v: &Version, constraint: &str) -> bool {
    match_range(std::slice::from_ref(v), constraint).is_some()
}

fn try_plain_exact(versions: &[Version], range: &str) -> Option<Version> {
    let base = parse(range.trim()).ok()?;
    versions.iter().find(|v| **v == base).cloned()
}

/// Tries each range kind in precedence order, returning the highest
/// matching version.
pub fn match_range(versions: &[Version], range: &str) -> Option<Version> {
    if let Some(has_any) = try_latest(versions, range) {
        return if has_any {
            highest_preferring_stable(versions.iter()).cloned()
        } else {
            None
        };
    }
    try_union(versions, range)
        .or_else(|| try_caret(versions, range))
        .or_else(|| try_tilde(versions, range))
        .or_else(|| try_comparator(versions, range))
        .or_else(|| try_exact(versions, range))
        .or_else(|| try_wildcard(versions, range))
        .or_else(|| try_hyphen(versions, range))
        .or_else(|| try_intersection(versions, range))
        .or_else(|| try_plain_exact(versions, range))
}

/// Convenience entry point taking raw version strings. Unparseable version
/// strings in `versions` are silently skipped (they can never be a valid
/// match target).
pub fn match_versions(versions: &[String], range: &str) -> Option<String> {
    let parsed: Vec<Version> = versions.iter().filter_map(|v| parse(v).ok()).collect();
    match_range(&parsed, range).map(|v| v.to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn versions(strs: &[&str]) -> Vec<Version> {
        strs.iter().map(|s| parse(s).unwrap()).collect()
    }

    #[test]
    fn parse_defaults_missing_components() {
        assert_eq!(parse("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(parse("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse("v1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn compare_unparseable_is_equal() {
        assert_eq!(compare("not-a-version", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn compare_orders_versions() {
        assert_eq!(compare("1.0.0", "2.0.0"), Ordering::Less);
        assert_eq!(compare("2.0.0", "1.0.0"), Ordering::Greater);
        assert_eq!(compare("1.0.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn latest_prefers_non_prerelease() {
        let vs = versions(&["1.0.0", "2.0.0-beta.1", "1.5.0"]);
        assert_eq!(match_range(&vs, "*").unwrap(), Version::new(1, 5, 0));
    }

    #[test]
    fn latest_falls_back_to_prerelease_if_only_option() {
        let vs = versions(&["2.0.0-beta.1"]);
        assert_eq!(match_range(&vs, "").unwrap().to_string(), "2.0.0-beta.1");
    }

    #[test]
    fn caret_nonzero_major() {
        let vs = versions(&["1.2.3", "1.9.0", "2.0.0"]);
        assert_eq!(match_range(&vs, "^1.2.3").unwrap(), Version::new(1, 9, 0));
    }

    #[test]
    fn caret_zero_major_nonzero_minor() {
        let vs = versions(&["0.2.3", "0.2.9", "0.3.0"]);
        assert_eq!(match_range(&vs, "^0.2.3").unwrap(), Version::new(0, 2, 9));
    }

    #[test]
    fn caret_zero_major_zero_minor() {
        let vs = versions(&["0.0.3", "0.0.9", "0.1.0"]);
        assert_eq!(match_range(&vs, "^0.0.3").unwrap(), Version::new(0, 0, 9));
    }

    #[test]
    fn caret_excludes_prerelease_unless_base_is_prerelease() {
        let vs = versions(&["1.2.3", "1.3.0-alpha.1"]);
        assert_eq!(match_range(&vs, "^1.2.3").unwrap(), Version::new(1, 2, 3));

        let vs = versions(&["1.2.3-alpha.1", "1.2.3"]);
        assert_eq!(
            match_range(&vs, "^1.2.3-alpha.1").unwrap().to_string(),
            "1.2.3-alpha.1"
        );
    }

    #[test]
    fn tilde_same_major_minor() {
        let vs = versions(&["1.2.3", "1.2.9", "1.3.0"]);
        assert_eq!(match_range(&vs, "~1.2.3").unwrap(), Version::new(1, 2, 9));
    }

    #[test]
    fn comparator_ranges() {
        let vs = versions(&["1.0.0", "1.5.0", "2.0.0"]);
        assert_eq!(match_range(&vs, ">=1.0.0").unwrap(), Version::new(2, 0, 0));
        assert_eq!(match_range(&vs, "<2.0.0").unwrap(), Version::new(1, 5, 0));
    }

    #[test]
    fn exact_match() {
        let vs = versions(&["1.0.0", "1.5.0"]);
        assert_eq!(match_range(&vs, "=1.5.0").unwrap(), Version::new(1, 5, 0));
    }

    #[test]
    fn wildcard_ranges() {
        let vs = versions(&["1.2.3", "1.2.9", "1.3.0", "2.0.0"]);
        assert_eq!(match_range(&vs, "1.2.x").unwrap(), Version::new(1, 2, 9));
        assert_eq!(match_range(&vs, "1.x").unwrap(), Version::new(1, 3, 0));
    }

    #[test]
    fn hyphen_range() {
        let vs = versions(&["1.0.0", "1.5.0", "2.0.0", "2.5.0"]);
        assert_eq!(
            match_range(&vs, "1.0.0 - 2.0.0").unwrap(),
            Version::new(2, 0, 0)
        );
    }

    #[test]
    fn space_separated_intersection() {
        let vs = versions(&["1.0.0", "1.5.0", "1.9.0", "2.0.0"]);
        assert_eq!(
            match_range(&vs, ">=1.0.0 <2.0.0").unwrap(),
            Version::new(1, 9, 0)
        );
    }

    #[test]
    fn union_of_ranges() {
        let vs = versions(&["1.0.0", "2.5.0", "3.0.0"]);
        assert_eq!(
            match_range(&vs, "^1.0.0 || ^2.0.0").unwrap(),
            Version::new(2, 5, 0)
        );
    }

    #[test]
    fn fallback_to_exact_match_for_unrecognized_string() {
        let vs = versions(&["1.2.3"]);
        assert_eq!(match_range(&vs, "1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn no_match_returns_none() {
        let vs = versions(&["1.0.0"]);
        assert!(match_range(&vs, "^2.0.0").is_none());
    }
}
