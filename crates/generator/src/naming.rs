//! Naming/collision registry and identifier case conversion
//!
//! Every identifier the emitter writes is reserved here first. The registry
//! is an explicit value threaded through planning by `&mut`; there is no
//! global naming state. A reservation never fails: a taken name is retried
//! with progressively more qualified variants (built from the group/version
//! path of the owner) and finally with a content hash of the owner key.
//!
//! Public type and unit names go through [`NamingRegistry::reserve_claims`]
//! instead, which settles every claim on a candidate at once. A name then
//! depends only on the claims that compete for the same candidate, never on
//! the order in which owners were visited.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Rust keywords that need a raw identifier (or a suffix) as field names
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be used as raw identifiers
const NON_RAW_KEYWORDS: &[&str] = &["crate", "self", "Self", "super"];

/// How letters are joined when a qualifier is appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// `object_meta` + `v1` → `object_meta_v1`
    Snake,
    /// `ObjectMeta` + `v1` → `ObjectMetaV1`
    Pascal,
}

/// Outcome of a reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// The candidate was free
    Base(String),
    /// The candidate was taken; a qualified variant was used
    Qualified(String),
    /// Every qualified variant was taken; a hash of the owner was appended
    Hashed(String),
}

impl Reservation {
    pub fn name(&self) -> &str {
        match self {
            Reservation::Base(name) | Reservation::Qualified(name) | Reservation::Hashed(name) => {
                name
            }
        }
    }

    pub fn into_name(self) -> String {
        match self {
            Reservation::Base(name) | Reservation::Qualified(name) | Reservation::Hashed(name) => {
                name
            }
        }
    }

    /// Whether the candidate collided with an earlier reservation
    pub fn collided(&self) -> bool {
        !matches!(self, Reservation::Base(_))
    }
}

/// One owner's claim on a candidate name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub owner: String,
    pub candidate: String,
    /// Group/version path of the owner, most specific first
    pub qualifiers: Vec<String>,
}

impl Claim {
    pub fn new(owner: impl Into<String>, candidate: impl Into<String>, qualifiers: Vec<String>) -> Self {
        Self {
            owner: owner.into(),
            candidate: candidate.into(),
            qualifiers,
        }
    }

    /// Candidate followed by every qualifier
    fn fully_qualified(&self, style: NameStyle) -> String {
        self.qualifiers
            .iter()
            .fold(self.candidate.clone(), |name, q| append(&name, q, style))
    }
}

/// Table of reserved identifiers, grouped by scope
#[derive(Debug, Clone, Default)]
pub struct NamingRegistry {
    /// scope → name → owner
    taken: BTreeMap<String, BTreeMap<String, String>>,
    /// (scope, owner, candidate) → final name
    granted: BTreeMap<(String, String, String), String>,
}

impl NamingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block names in a scope, e.g. names Terraform reserves at a resource root
    pub fn block<'a>(&mut self, scope: &str, names: impl IntoIterator<Item = &'a str>) {
        let table = self.taken.entry(scope.to_string()).or_default();
        for name in names {
            table.insert(name.to_string(), String::new());
        }
    }

    pub fn is_taken(&self, scope: &str, name: &str) -> bool {
        self.taken
            .get(scope)
            .is_some_and(|table| table.contains_key(name))
    }

    /// Reserve `candidate` in `scope` for `owner`, with no qualifiers
    pub fn reserve(&mut self, scope: &str, candidate: &str, owner: &str) -> String {
        self.reserve_qualified(scope, candidate, &[], NameStyle::Snake, owner)
            .into_name()
    }

    /// Reserve `candidate` in `scope` for `owner`
    ///
    /// On collision the qualifiers are appended one after another
    /// (`base_q1`, `base_q1_q2`, ...). When all of those are taken a hash of
    /// `owner` is appended instead. Reserving the same candidate for the
    /// same owner twice returns the same name.
    pub fn reserve_qualified(
        &mut self,
        scope: &str,
        candidate: &str,
        qualifiers: &[String],
        style: NameStyle,
        owner: &str,
    ) -> Reservation {
        let key = (scope.to_string(), owner.to_string(), candidate.to_string());
        if let Some(name) = self.granted.get(&key) {
            return Reservation::Base(name.clone());
        }

        let reservation = self.find_free(scope, candidate, qualifiers, style, owner);
        if reservation.collided() {
            debug!(
                "Name {:?} taken in scope {}, using {:?}",
                candidate,
                scope,
                reservation.name()
            );
        }
        self.taken
            .entry(scope.to_string())
            .or_default()
            .insert(reservation.name().to_string(), owner.to_string());
        self.granted.insert(key, reservation.name().to_string());
        reservation
    }

    /// Reserve names for a batch of claims in `scope`, one claim per owner;
    /// returns owner → name
    ///
    /// A candidate claimed by a single owner, and not already taken, is
    /// granted as is. A contested candidate is granted to nobody: every
    /// claimant gets the candidate followed by all of its qualifiers. When
    /// those fully qualified names still coincide (or are taken), a hash of
    /// the owner is appended instead.
    pub fn reserve_claims(
        &mut self,
        scope: &str,
        claims: &[Claim],
        style: NameStyle,
    ) -> BTreeMap<String, String> {
        let mut claimants: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for claim in claims {
            claimants
                .entry(claim.candidate.as_str())
                .or_default()
                .insert(claim.owner.as_str());
        }

        let mut desired: BTreeMap<&str, (String, bool)> = BTreeMap::new();
        for claim in claims {
            let uncontested = claimants[claim.candidate.as_str()].len() == 1
                && !self.is_taken(scope, &claim.candidate);
            let name = if uncontested {
                claim.candidate.clone()
            } else {
                debug!(
                    "Name {:?} is contested in scope {}, qualifying it for {}",
                    claim.candidate, scope, claim.owner
                );
                claim.fully_qualified(style)
            };
            desired.insert(claim.owner.as_str(), (name, uncontested));
        }

        // base names win over qualified names that happen to spell the same
        let mut holders: BTreeMap<&str, (usize, bool)> = BTreeMap::new();
        for (name, base) in desired.values() {
            let entry = holders.entry(name.as_str()).or_insert((0, false));
            entry.0 += 1;
            entry.1 |= *base;
        }

        let mut granted = BTreeMap::new();
        for claim in claims {
            let Some((name, base)) = desired.get(claim.owner.as_str()) else {
                continue;
            };
            let (count, held_by_base) = holders[name.as_str()];
            let clash = !base && (count > 1 || held_by_base);
            let name = if clash || self.is_taken(scope, name) {
                self.hashed(scope, &claim.candidate, style, &claim.owner)
            } else {
                name.clone()
            };
            self.taken
                .entry(scope.to_string())
                .or_default()
                .insert(name.clone(), claim.owner.clone());
            self.granted.insert(
                (scope.to_string(), claim.owner.clone(), claim.candidate.clone()),
                name.clone(),
            );
            granted.insert(claim.owner.clone(), name);
        }
        granted
    }

    /// `candidate` followed by the shortest free prefix of the owner's digest
    fn hashed(&self, scope: &str, candidate: &str, style: NameStyle, owner: &str) -> String {
        let digest = hex::encode(Sha256::digest(owner.as_bytes()));
        for len in [8, 16, 32, 64] {
            let hashed = append_hash(candidate, &digest[..len], style);
            if !self.is_taken(scope, &hashed) {
                return hashed;
            }
        }
        // Only reachable when the same owner digest was granted under another candidate
        append_hash(&append_hash(candidate, &digest, style), "x", style)
    }

    fn find_free(
        &self,
        scope: &str,
        candidate: &str,
        qualifiers: &[String],
        style: NameStyle,
        owner: &str,
    ) -> Reservation {
        if !self.is_taken(scope, candidate) {
            return Reservation::Base(candidate.to_string());
        }

        let mut qualified = candidate.to_string();
        for qualifier in qualifiers {
            qualified = append(&qualified, qualifier, style);
            if !self.is_taken(scope, &qualified) {
                return Reservation::Qualified(qualified);
            }
        }

        Reservation::Hashed(self.hashed(scope, candidate, style, owner))
    }
}

fn append_hash(base: &str, digest: &str, style: NameStyle) -> String {
    match style {
        NameStyle::Snake => format!("{}_{}", base, digest),
        NameStyle::Pascal => format!("{}{}", base, digest),
    }
}

fn append(base: &str, qualifier: &str, style: NameStyle) -> String {
    match style {
        NameStyle::Snake => format!("{}_{}", base, to_snake_case(qualifier)),
        NameStyle::Pascal => format!("{}{}", base, to_pascal_case(qualifier)),
    }
}

/// Convert a JSON property name to a Terraform attribute name
///
/// `storageClassName` → `storage_class_name`, `podIPs` → `pod_ips`,
/// `x-kubernetes-list-type` → `x_kubernetes_list_type`, `$ref` → `ref`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    let mut pending_separator = false;

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            pending_separator = !out.is_empty();
            continue;
        }
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let after = chars.get(i + 2).copied();
            let starts_word = prev.is_ascii_lowercase() || prev.is_ascii_digit();
            // `IPFamily`: the last capital of an acronym starts the next word,
            // except for a plural `s` (`podIPs`)
            let ends_acronym = prev.is_ascii_uppercase()
                && next.is_some_and(|n| n.is_ascii_lowercase())
                && !(next == Some('s') && after.map_or(true, |a| !a.is_ascii_lowercase()));
            if starts_word || ends_acronym {
                pending_separator = !out.is_empty();
            }
        }
        if pending_separator && !out.ends_with('_') {
            out.push('_');
        }
        pending_separator = false;
        out.push(c.to_ascii_lowercase());
    }

    if out.is_empty() {
        return "field".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Convert any separated or camel-cased name to PascalCase
///
/// `apps_deployment_v1` → `AppsDeploymentV1`, `cert-manager.io` → `CertManagerIo`,
/// `containerPort` → `ContainerPort`.
pub fn to_pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in to_snake_case(name).split('_').filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'T');
    }
    out
}

/// Rust identifier for a snake_case name, escaping keywords
pub fn rust_ident(name: &str) -> String {
    if NON_RAW_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

/// Field name as serde sees it (raw identifiers lose their `r#`)
pub fn serde_name(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}
