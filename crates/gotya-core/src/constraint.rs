//! Semver constraint parsing and evaluation.
//!
//! A constraint is a comma-separated conjunction of range terms using the
//! operators `=`, `!=`, `<`, `<=`, `>`, `>=`, `~>`. An invalid version
//! string never satisfies any constraint, and parsing never panics.

use semver::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Pessimistic,
}

#[derive(Debug, Clone)]
struct Term {
    op: Op,
    version: Version,
}

/// Normalize a constraint string: an empty (or all-whitespace) constraint
/// becomes `">= 0.0.0"`.
#[must_use]
pub fn normalize(constraint: &str) -> String {
    if constraint.trim().is_empty() {
        ">= 0.0.0".to_string()
    } else {
        constraint.to_string()
    }
}

/// Deduplicate a list of constraint strings, preserving first occurrence,
/// dropping empty entries, and joining survivors with `", "`. An
/// all-empty input normalizes to `">= 0.0.0"`.
#[must_use]
pub fn combine(constraints: &[String]) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut parts = Vec::new();
    for c in constraints {
        let trimmed = c.trim();
        if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        ">= 0.0.0".to_string()
    } else {
        parts.join(", ")
    }
}

fn parse_term(raw: &str) -> Option<Term> {
    let raw = raw.trim();
    let (op, rest) = if let Some(rest) = raw.strip_prefix("~>") {
        (Op::Pessimistic, rest)
    } else if let Some(rest) = raw.strip_prefix(">=") {
        (Op::Ge, rest)
    } else if let Some(rest) = raw.strip_prefix("<=") {
        (Op::Le, rest)
    } else if let Some(rest) = raw.strip_prefix("!=") {
        (Op::Ne, rest)
    } else if let Some(rest) = raw.strip_prefix('=') {
        (Op::Eq, rest)
    } else if let Some(rest) = raw.strip_prefix('<') {
        (Op::Lt, rest)
    } else if let Some(rest) = raw.strip_prefix('>') {
        (Op::Gt, rest)
    } else {
        (Op::Eq, raw)
    };
    let version = parse_version_loose(rest.trim())?;
    Some(Term { op, version })
}

/// Parse a version, accepting the partial forms `"X"` and `"X.Y"` that
/// the pessimistic operator commonly takes (filled out with zeros).
fn parse_version_loose(text: &str) -> Option<Version> {
    if let Ok(v) = Version::parse(text) {
        return Some(v);
    }
    match text.split('.').collect::<Vec<_>>().as_slice() {
        [major] => Version::parse(&format!("{major}.0.0")).ok(),
        [major, minor] => Version::parse(&format!("{major}.{minor}.0")).ok(),
        _ => None,
    }
}

/// The exclusive upper bound for a `~>` term: locks everything above the
/// most specific component given. `~> 1.2.3` excludes `>= 1.3.0`; `~> 1.2`
/// excludes `>= 2.0.0`.
fn pessimistic_upper_bound(base: &Version, raw_rhs: &str) -> Version {
    let dot_count = raw_rhs.trim().matches('.').count();
    if dot_count >= 2 {
        Version::new(base.major, base.minor + 1, 0)
    } else {
        Version::new(base.major + 1, 0, 0)
    }
}

fn term_satisfied(term: &Term, raw_rhs: &str, version: &Version) -> bool {
    match term.op {
        Op::Eq => version == &term.version,
        Op::Ne => version != &term.version,
        Op::Lt => version < &term.version,
        Op::Le => version <= &term.version,
        Op::Gt => version > &term.version,
        Op::Ge => version >= &term.version,
        Op::Pessimistic => {
            let upper = pessimistic_upper_bound(&term.version, raw_rhs);
            version >= &term.version && version < &upper
        }
    }
}

/// True iff `version_str` parses and satisfies every comma-separated term
/// in `constraint`. An unparseable version, or any unparseable term,
/// never matches.
#[must_use]
pub fn satisfies(version_str: &str, constraint: &str) -> bool {
    let Ok(version) = Version::parse(version_str) else {
        return false;
    };
    let normalized = normalize(constraint);
    normalized.split(',').all(|raw_term| {
        let rhs = raw_term
            .trim()
            .trim_start_matches("~>")
            .trim_start_matches(">=")
            .trim_start_matches("<=")
            .trim_start_matches("!=")
            .trim_start_matches(['=', '<', '>'])
            .trim();
        parse_term(raw_term).is_some_and(|term| term_satisfied(&term, rhs, &version))
    })
}
