//! npm-style version range parsing, matching, and comparison.
//!
//! Versions are plain [`semver::Version`]s. Ranges follow the npm grammar:
//! - comparators `<`, `<=`, `>`, `>=`, `=` and bare versions
//! - caret `^1.2.3`, tilde `~1.2.3`, x-ranges `1.x`, `1.2.*`, `*`, `""`
//! - partial versions `1`, `1.2` and hyphen ranges `1.2.3 - 2.3.4`
//! - whitespace-separated intersections and `||` unions
//!
//! Every range is desugared into a union of comparator sets, which is what
//! matching, equality and the pinned check operate on.

use std::cmp::Ordering;
use std::fmt;

use semver::{BuildMetadata, Prerelease, Version};

/// Comparison operator of a desugared comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Op {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }
}

/// A single `op version` constraint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    pub fn matches(&self, version: &Version) -> bool {
        let ord = version.cmp_precedence(&self.version);
        match self.op {
            Op::Eq => ord == Ordering::Equal,
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
        }
    }

    fn bounds_above(&self) -> bool {
        matches!(self.op, Op::Eq | Op::Lt | Op::Le)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.version)
    }
}

/// A parsed npm range: a union of intersections of comparators.
///
/// An empty intersection matches every non-prerelease version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    sets: Vec<Vec<Comparator>>,
}

/// Why a range string failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeError {
    pub input: String,
    pub reason: String,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid range '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for RangeError {}

impl VersionRange {
    /// Parse an npm range expression.
    pub fn parse(input: &str) -> Result<Self, RangeError> {
        let fail = |reason: &str| RangeError {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let mut sets = Vec::new();
        for alternative in input.split("||") {
            let set = parse_intersection(alternative.trim()).map_err(|r| fail(&r))?;
            sets.push(set);
        }
        Ok(Self { sets })
    }

    /// Check if a version satisfies this range.
    pub fn satisfies(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set_matches(set, version))
    }

    /// Whether every alternative has an upper bound, i.e. the range can never
    /// float to an arbitrarily new major release.
    pub fn is_bounded(&self) -> bool {
        self.sets
            .iter()
            .all(|set| set.iter().any(Comparator::bounds_above))
    }

    /// Canonical form: comparators sorted and deduplicated within each
    /// alternative, alternatives sorted and deduplicated.
    fn normalized(&self) -> Vec<Vec<Comparator>> {
        let mut sets: Vec<Vec<Comparator>> = self
            .sets
            .iter()
            .map(|set| {
                let mut set = set.clone();
                set.sort();
                set.dedup();
                set
            })
            .collect();
        sets.sort();
        sets.dedup();
        sets
    }

    pub fn comparator_sets(&self) -> &[Vec<Comparator>] {
        &self.sets
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, set) in self.sets.iter().enumerate() {
            if i > 0 {
                f.write_str(" || ")?;
            }
            if set.is_empty() {
                f.write_str("*")?;
                continue;
            }
            for (j, c) in set.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

fn set_matches(set: &[Comparator], version: &Version) -> bool {
    if !set.iter().all(|c| c.matches(version)) {
        return false;
    }
    if version.pre.is_empty() {
        return true;
    }
    // Prereleases only match when a comparator opts in on the same tuple.
    set.iter().any(|c| {
        !c.version.pre.is_empty()
            && c.version.major == version.major
            && c.version.minor == version.minor
            && c.version.patch == version.patch
    })
}

/// Parse a concrete version, tolerating a leading `v` or `=`.
pub fn parse_version(input: &str) -> Option<Version> {
    let trimmed = input.trim().trim_start_matches(['v', '=']).trim();
    Version::parse(trimmed).ok()
}

/// Whether `version` satisfies `range`. Unparseable input never satisfies.
pub fn satisfies(version: &str, range: &str) -> bool {
    match (parse_version(version), VersionRange::parse(range)) {
        (Some(v), Ok(r)) => r.satisfies(&v),
        _ => false,
    }
}

/// The highest of `versions` that satisfies `range`.
pub fn max_satisfying<'a, I>(versions: I, range: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let range = VersionRange::parse(range).ok()?;
    versions
        .into_iter()
        .filter_map(|raw| parse_version(raw).map(|v| (v, raw)))
        .filter(|(v, _)| range.satisfies(v))
        .max_by(|(a, _), (b, _)| a.cmp_precedence(b).then_with(|| a.cmp(b)))
        .map(|(_, raw)| raw)
}

/// Whether two range strings denote the same constraint.
///
/// Compares the desugared comparator sets, so `^1.2.0` equals `^1.2.0 ` and
/// `>=1.2.0 <2.0.0` but not `~1.2.0`. A range that fails to parse is never
/// equal to anything.
pub fn ranges_equal(a: &str, b: &str) -> bool {
    match (VersionRange::parse(a), VersionRange::parse(b)) {
        (Ok(a), Ok(b)) => a.normalized() == b.normalized(),
        _ => false,
    }
}

/// Whether a requested range pins its dependency: it is neither a wildcard
/// nor an open-ended lower bound. Tags and unparseable ranges float.
pub fn is_pinned(range: &str) -> bool {
    VersionRange::parse(range)
        .map(|r| r.is_bounded())
        .unwrap_or(false)
}

/// A version with any of its components possibly wildcarded.
#[derive(Debug, Clone)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn is_any(&self) -> bool {
        self.major.is_none()
    }

    fn is_full(&self) -> bool {
        self.patch.is_some()
    }

    /// Missing components filled with zero.
    fn floor(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: if self.is_full() {
                self.pre.clone()
            } else {
                Prerelease::EMPTY
            },
            build: BuildMetadata::EMPTY,
        }
    }

    /// First version past the wildcarded part (`1.2` → `1.3.0`, `1` → `2.0.0`).
    fn ceiling(&self) -> Version {
        match (self.major, self.minor) {
            (Some(major), Some(minor)) => Version::new(major, minor + 1, 0),
            (Some(major), None) => Version::new(major + 1, 0, 0),
            _ => Version::new(0, 0, 0),
        }
    }
}

fn parse_component(token: &str) -> Result<Option<u64>, String> {
    match token {
        "x" | "X" | "*" => Ok(None),
        _ => token
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("'{token}' is not a version number")),
    }
}

fn parse_partial(input: &str) -> Result<Partial, String> {
    let input = input.trim().trim_start_matches(['v', '=']);
    if input.is_empty() {
        return Ok(Partial {
            major: None,
            minor: None,
            patch: None,
            pre: Prerelease::EMPTY,
        });
    }
    let without_build = input.split('+').next().unwrap_or(input);
    let (core, pre) = match without_build.split_once('-') {
        Some((core, pre)) => (core, pre),
        None => (without_build, ""),
    };
    let mut parts = core.split('.');
    let major = parse_component(parts.next().unwrap_or(""))?;
    let minor = match parts.next() {
        Some(p) => parse_component(p)?,
        None => None,
    };
    let patch = match parts.next() {
        Some(p) => parse_component(p)?,
        None => None,
    };
    if parts.next().is_some() {
        return Err(format!("'{input}' has too many components"));
    }
    // A wildcard swallows everything after it: `1.x.3` means `1.x`.
    let (minor, patch) = match (major, minor) {
        (None, _) => (None, None),
        (Some(_), None) => (None, None),
        (Some(_), Some(_)) => (minor, patch),
    };
    let pre = if pre.is_empty() {
        Prerelease::EMPTY
    } else {
        Prerelease::new(pre).map_err(|e| format!("bad prerelease '{pre}': {e}"))?
    };
    Ok(Partial {
        major,
        minor,
        patch,
        pre,
    })
}

const OPERATORS: [&str; 8] = [">=", "<=", "~>", ">", "<", "=", "^", "~"];

fn split_operator(token: &str) -> (&str, &str) {
    for op in OPERATORS {
        if let Some(rest) = token.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", token)
}

fn parse_intersection(input: &str) -> Result<Vec<Comparator>, String> {
    if let Some((lower, upper)) = input.split_once(" - ") {
        return hyphen_range(lower, upper);
    }

    // Re-attach operators written with a space, e.g. `>= 1.2.3`.
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;
    for raw in input.split_whitespace() {
        if OPERATORS.contains(&raw) {
            pending_op = Some(raw);
            continue;
        }
        match pending_op.take() {
            Some(op) => tokens.push(format!("{op}{raw}")),
            None => tokens.push(raw.to_string()),
        }
    }
    if let Some(op) = pending_op {
        return Err(format!("dangling operator '{op}'"));
    }

    let mut set = Vec::new();
    for token in &tokens {
        set.extend(desugar(token)?);
    }
    Ok(set)
}

fn hyphen_range(lower: &str, upper: &str) -> Result<Vec<Comparator>, String> {
    let lower = parse_partial(lower)?;
    let upper = parse_partial(upper)?;
    let mut set = Vec::new();
    if !lower.is_any() {
        set.push(Comparator::new(Op::Ge, lower.floor()));
    }
    if upper.is_full() {
        set.push(Comparator::new(Op::Le, upper.floor()));
    } else if !upper.is_any() {
        set.push(Comparator::new(Op::Lt, upper.ceiling()));
    }
    Ok(set)
}

fn desugar(token: &str) -> Result<Vec<Comparator>, String> {
    let (op, rest) = split_operator(token);
    let p = parse_partial(rest)?;
    let nothing = || vec![Comparator::new(Op::Lt, Version::new(0, 0, 0))];

    let set = match op {
        "" | "=" => {
            if p.is_any() {
                vec![]
            } else if p.is_full() {
                vec![Comparator::new(Op::Eq, p.floor())]
            } else {
                vec![
                    Comparator::new(Op::Ge, p.floor()),
                    Comparator::new(Op::Lt, p.ceiling()),
                ]
            }
        }
        "^" => {
            if p.is_any() {
                vec![]
            } else {
                let floor = p.floor();
                let upper = match (p.major, p.minor, p.patch) {
                    (Some(0), Some(0), Some(patch)) => Version::new(0, 0, patch + 1),
                    (Some(0), Some(minor), _) => Version::new(0, minor + 1, 0),
                    (Some(major), _, _) => Version::new(major + 1, 0, 0),
                    (None, _, _) => unreachable!("wildcard handled above"),
                };
                vec![Comparator::new(Op::Ge, floor), Comparator::new(Op::Lt, upper)]
            }
        }
        "~" | "~>" => {
            if p.is_any() {
                vec![]
            } else {
                let upper = match (p.major, p.minor) {
                    (Some(major), Some(minor)) => Version::new(major, minor + 1, 0),
                    (Some(major), None) => Version::new(major + 1, 0, 0),
                    (None, _) => unreachable!("wildcard handled above"),
                };
                vec![
                    Comparator::new(Op::Ge, p.floor()),
                    Comparator::new(Op::Lt, upper),
                ]
            }
        }
        ">" => {
            if p.is_any() {
                nothing()
            } else if p.is_full() {
                vec![Comparator::new(Op::Gt, p.floor())]
            } else {
                vec![Comparator::new(Op::Ge, p.ceiling())]
            }
        }
        ">=" => {
            if p.is_any() {
                vec![]
            } else {
                vec![Comparator::new(Op::Ge, p.floor())]
            }
        }
        "<" => {
            if p.is_any() {
                nothing()
            } else {
                vec![Comparator::new(Op::Lt, p.floor())]
            }
        }
        "<=" => {
            if p.is_any() {
                vec![]
            } else if p.is_full() {
                vec![Comparator::new(Op::Le, p.floor())]
            } else {
                vec![Comparator::new(Op::Lt, p.ceiling())]
            }
        }
        other => return Err(format!("unknown operator '{other}'")),
    };
    Ok(set)
}
