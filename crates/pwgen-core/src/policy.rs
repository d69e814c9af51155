//! PolicyEngine: alphabet assembly, class-coverage check (§4.7) and the
//! fixed class contents + named profiles from `pwgen.py` (§3, SPEC_FULL §3).

use crate::error::PwgenError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0123456789";
pub const SYMBOLS: &str = "!#$%&()*+,-./:;<=>?@[]^_{|}~";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Lower,
    Upper,
    Digits,
    Symbols,
}

impl ClassKind {
    fn chars(self) -> &'static str {
        match self {
            ClassKind::Lower => LOWER,
            ClassKind::Upper => UPPER,
            ClassKind::Digits => DIGITS,
            ClassKind::Symbols => SYMBOLS,
        }
    }
}

/// `length` (4..128), `classes` (ordered, deduplicated), `forbid` (set of
/// single chars removed from the final alphabet). Order of `classes` is
/// significant: alphabet assembly concatenates class contents in this order
/// (§4.7), so this is kept as an ordered `Vec` rather than an unordered set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub length: u32,
    pub classes: Vec<ClassKind>,
    #[serde(default)]
    pub forbid: Vec<char>,
}

impl Policy {
    pub fn new(length: u32, classes: Vec<ClassKind>, forbid: Vec<char>) -> Self {
        let mut seen = BTreeSet::new();
        let deduped = classes
            .into_iter()
            .filter(|c| seen.insert(*c))
            .collect();
        Policy {
            length,
            classes: deduped,
            forbid,
        }
    }

    pub fn validate(&self) -> Result<(), PwgenError> {
        if !(4..=128).contains(&self.length) {
            return Err(PwgenError::PolicyInvalid(format!(
                "length {} out of range [4,128]",
                self.length
            )));
        }
        if self.classes.is_empty() {
            return Err(PwgenError::PolicyInvalid("no classes selected".into()));
        }
        let (alphabet, _) = build_alphabet(self)?;
        if alphabet.is_empty() {
            return Err(PwgenError::PolicyInvalid(
                "alphabet empty after forbid removal".into(),
            ));
        }
        Ok(())
    }

    /// Canonical JSON for this policy: keys sorted ascending, no whitespace —
    /// the exact form mixed into the derivation context (§4.4).
    pub fn canonical_json(&self) -> String {
        #[derive(Serialize)]
        struct Canonical<'a> {
            classes: &'a [ClassKind],
            forbid: &'a [char],
            length: u32,
        }
        serde_json::to_string(&Canonical {
            classes: &self.classes,
            forbid: &self.forbid,
            length: self.length,
        })
        .expect("policy serializes")
    }
}

/// Concatenate the fixed strings for each class in `policy.classes` (ordered,
/// duplicates preserved only if a character appears in multiple classes),
/// then remove every character in `policy.forbid`.
pub fn build_alphabet(policy: &Policy) -> Result<(Vec<char>, Vec<BTreeSet<char>>), PwgenError> {
    let mut allow: Vec<char> = Vec::new();
    let mut required_sets = Vec::with_capacity(policy.classes.len());
    for class in &policy.classes {
        allow.extend(class.chars().chars());
        required_sets.push(class.chars().chars().collect());
    }
    let forbid: BTreeSet<char> = policy.forbid.iter().copied().collect();
    allow.retain(|c| !forbid.contains(c));
    if allow.is_empty() {
        return Err(PwgenError::PolicyInvalid(
            "empty final alphabet (check forbid/classes)".into(),
        ));
    }
    Ok((allow, required_sets))
}

/// The result satisfies the policy iff for each required class, at least one
/// output character lies in that class (pre-`forbid`).
pub fn satisfies_classes(password: &str, required_sets: &[BTreeSet<char>]) -> bool {
    let present: BTreeSet<char> = password.chars().collect();
    required_sets
        .iter()
        .all(|required| required.intersection(&present).next().is_some())
}

/// Named policy profiles carried over from the original `pwgen.py` (SPEC_FULL §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Strict,
    Legacy,
    Pin,
    Hard,
    Ultra,
}

impl Profile {
    pub fn parse(name: &str) -> Option<Profile> {
        match name {
            "strict" => Some(Profile::Strict),
            "legacy" => Some(Profile::Legacy),
            "pin" => Some(Profile::Pin),
            "hard" => Some(Profile::Hard),
            "ultra" => Some(Profile::Ultra),
            _ => None,
        }
    }
}

fn default_forbid() -> Vec<char> {
    vec!['"', '\'', '`', ' ']
}

impl From<Profile> for Policy {
    fn from(profile: Profile) -> Self {
        use ClassKind::*;
        match profile {
            Profile::Strict => Policy::new(24, vec![Lower, Upper, Digits, Symbols], default_forbid()),
            Profile::Legacy => Policy::new(16, vec![Lower, Upper, Digits], default_forbid()),
            Profile::Pin => Policy::new(10, vec![Digits], vec![]),
            Profile::Hard => Policy::new(40, vec![Lower, Upper, Digits, Symbols], default_forbid()),
            Profile::Ultra => Policy::new(64, vec![Lower, Upper, Digits, Symbols], default_forbid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_alphabet_removes_forbidden_chars() {
        let policy = Policy::new(8, vec![ClassKind::Digits], vec!['0', '1']);
        let (alphabet, _) = build_alphabet(&policy).unwrap();
        assert!(!alphabet.contains(&'0'));
        assert!(!alphabet.contains(&'1'));
        assert!(alphabet.contains(&'2'));
    }

    #[test]
    fn empty_alphabet_is_rejected() {
        let policy = Policy::new(8, vec![ClassKind::Digits], DIGITS.chars().collect());
        assert!(build_alphabet(&policy).is_err());
    }

    #[test]
    fn profile_strict_matches_reference_shape() {
        let policy: Policy = Profile::Strict.into();
        assert_eq!(policy.length, 24);
        assert_eq!(policy.classes.len(), 4);
        assert_eq!(policy.forbid, default_forbid());
    }

    #[test]
    fn canonical_json_has_no_whitespace_and_sorted_keys() {
        let policy: Policy = Profile::Pin.into();
        let json = policy.canonical_json();
        assert!(!json.contains(' '));
        let classes_pos = json.find("classes").unwrap();
        let forbid_pos = json.find("forbid").unwrap();
        let length_pos = json.find("length").unwrap();
        assert!(classes_pos < forbid_pos && forbid_pos < length_pos);
    }
}
