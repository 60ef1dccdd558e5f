//! Rule resolution
//!
//! Exactly one action applies to every field. Tag rules win over VR rules,
//! and anything matched by neither is kept.

use crate::anonymization::dictionary::TagDictionary;
use crate::anonymization::policy::{ActionSpec, PolicyConfig};
use crate::domain::{Tag, Vr};

static KEEP: ActionSpec = ActionSpec::Keep;

/// Where a resolved action came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    TagRule,
    VrRule,
    /// No rule matched
    Default,
}

/// A resolved action together with its origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    pub action: &'a ActionSpec,
    pub source: RuleSource,
    /// Tag missing from the dictionary and not named by a tag rule
    pub unrecognized: bool,
}

/// Two-tier lookup: `tag_rules[tag]`, else `vr_rules[vr]`, else keep
pub fn resolve<'a>(tag: &Tag, vr: Vr, policy: &'a PolicyConfig) -> &'a ActionSpec {
    policy
        .tag_rules
        .get(tag)
        .or_else(|| policy.vr_rules.get(&vr))
        .unwrap_or(&KEEP)
}

/// Dictionary-aware resolution used by the field walk
///
/// Precedence is the same as [`resolve`]. The field's own VR drives the VR
/// rule, so tags the dictionary does not know are still covered by it; they
/// are flagged as unrecognized unless a tag rule names them.
pub fn resolve_field<'a>(
    tag: &Tag,
    vr: Vr,
    policy: &'a PolicyConfig,
    dictionary: &TagDictionary,
) -> Resolution<'a> {
    if let Some(action) = policy.tag_rules.get(tag) {
        return Resolution {
            action,
            source: RuleSource::TagRule,
            unrecognized: false,
        };
    }
    let unrecognized = !dictionary.contains(tag);
    match policy.vr_rules.get(&vr) {
        Some(action) => Resolution {
            action,
            source: RuleSource::VrRule,
            unrecognized,
        },
        None => Resolution {
            action: &KEEP,
            source: RuleSource::Default,
            unrecognized,
        },
    }
}
