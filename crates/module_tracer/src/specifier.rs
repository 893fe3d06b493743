//! Specifier classification (bare vs. relative vs. absolute vs. URL) and
//! bare-specifier package-name extraction.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    Relative,
    Absolute,
    Url,
    Bare,
}

/// A specifier is bare iff it is non-empty, does not begin with `./`,
/// `../`, or `/`, and does not contain `://`.
pub fn classify(specifier: &str) -> SpecifierKind {
    if specifier.is_empty() {
        return SpecifierKind::Bare;
    }
    if specifier.starts_with("./") || specifier.starts_with("../") {
        return SpecifierKind::Relative;
    }
    if specifier.starts_with('/') {
        return SpecifierKind::Absolute;
    }
    if specifier.contains("://") {
        return SpecifierKind::Url;
    }
    SpecifierKind::Bare
}

/// For `@scope/name[/rest]` returns `@scope/name`; for `name[/rest]`
/// returns `name`.
pub fn package_name(bare_specifier: &str) -> &str {
    if bare_specifier.starts_with('@') {
        let mut slashes = bare_specifier.match_indices('/');
        return match (slashes.next(), slashes.next()) {
            (Some(_), Some((second, _))) => &bare_specifier[..second],
            _ => bare_specifier,
        };
    }
    match bare_specifier.find('/') {
        Some(slash) => &bare_specifier[..slash],
        None => bare_specifier,
    }
}
