//! Antibody detection and intervention taxonomy.
//!
//! All matching is whole-word / suffix regex on the lower-cased name, never
//! raw substring, so "Antibody-free buffer" style false positives stay rare
//! and "mab" inside an unrelated word does not count.
//!
//! The trial filter is a heuristic: a name match alone over-includes
//! (diagnostic and laboratory antibodies), a declared type alone both over-
//! and under-includes. `FilterPolicy` makes the boundary tunable.

use std::collections::HashSet;
use std::sync::OnceLock;

use abtox_common::FilterConfig;
use regex::Regex;

use crate::models::{InterventionClass, InterventionType, TrialRecord};

const ADC_PATTERN: &str = r"\bantibody[\s-]*drug\s+conjugates?\b|\badcs?\b";

fn antibody_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            r"\bmonoclonal\s+antibod(?:y|ies)\b",
            r"\bantibod(?:y|ies)\b",
            ADC_PATTERN,
            r"\bbi-?specific\b",
            r"\btri-?specific\b",
            r"\b[a-z]+mab\b",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn mab_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-z]+mab\b").unwrap())
}

/// Classification rules in priority order; the first match wins.
fn class_rules() -> &'static [(InterventionClass, Regex)] {
    static RULES: OnceLock<Vec<(InterventionClass, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            (InterventionClass::Adc, Regex::new(ADC_PATTERN).unwrap()),
            (InterventionClass::Bispecific, Regex::new(r"\bbi-?specific\b").unwrap()),
            (InterventionClass::Trispecific, Regex::new(r"\btri-?specific\b").unwrap()),
            (InterventionClass::Mab, Regex::new(r"\b[a-z]+mab\b").unwrap()),
            (InterventionClass::Antibody, Regex::new(r"\bantibod(?:y|ies)\b").unwrap()),
        ]
    })
}

/// True if the name looks like an antibody-class therapeutic.
pub fn is_antibody_intervention(name: &str) -> bool {
    if name.trim().is_empty() {
        return false;
    }
    let n = name.to_lowercase();
    antibody_patterns().iter().any(|re| re.is_match(&n))
}

/// Strict generic `…mab` suffix token (e.g. "Pembrolizumab", "I-131 Tositumomab").
pub fn has_mab_suffix(name: &str) -> bool {
    mab_suffix_regex().is_match(&name.to_lowercase())
}

/// Map a name onto the antibody taxonomy. `adc` outranks `mab`, so an
/// antibody-drug conjugate named "…mab …" resolves to the specific class.
pub fn classify_intervention(name: &str) -> InterventionClass {
    let n = name.to_lowercase();
    class_rules()
        .iter()
        .find(|(_, re)| re.is_match(&n))
        .map(|(class, _)| *class)
        .unwrap_or(InterventionClass::Other)
}

/// Boundary of the antibody-trial heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPolicy {
    /// Declared types accepted as therapeutic.
    pub therapeutic_types: HashSet<InterventionType>,
    /// Accept a strict `…mab` name whatever its declared type.
    pub mab_suffix_overrides_type: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            therapeutic_types: [InterventionType::Drug, InterventionType::Biological]
                .into_iter()
                .collect(),
            mab_suffix_overrides_type: true,
        }
    }
}

impl FilterPolicy {
    pub fn from_config(cfg: &FilterConfig) -> Self {
        Self {
            therapeutic_types: cfg
                .therapeutic_types
                .iter()
                .map(|t| InterventionType::from_registry(t))
                .collect(),
            mab_suffix_overrides_type: cfg.mab_suffix_overrides_type,
        }
    }

    /// Whether a single (name, declared type) pair qualifies.
    pub fn accepts(&self, name: &str, declared_type: InterventionType) -> bool {
        if !is_antibody_intervention(name) {
            return false;
        }
        self.therapeutic_types.contains(&declared_type)
            || (self.mab_suffix_overrides_type && has_mab_suffix(name))
    }

    /// True iff at least one intervention qualifies.
    pub fn is_antibody_trial(&self, trial: &TrialRecord) -> bool {
        trial
            .interventions
            .iter()
            .any(|iv| self.accepts(&iv.name, iv.declared_type))
    }
}

/// `is_antibody_trial` under the default policy.
pub fn is_antibody_trial(trial: &TrialRecord) -> bool {
    FilterPolicy::default().is_antibody_trial(trial)
}
