//! Sense lists: named perceptual channels with maximum ranges.

/// One sense: an independent perceptual channel with its own maximum range.
#[derive(Debug, Clone, PartialEq)]
pub struct Sense {
    /// Sense name, matched against region limit keys.
    pub name: String,
    /// Maximum range in scene units.
    pub range: f64,
}

impl Sense {
    /// Create a sense.
    pub fn new(name: impl Into<String>, range: f64) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

/// Normalize a sense list for the caster: drop non-positive ranges and sort
/// by descending range (name-ascending on ties, for determinism).
///
/// The descending order is load-bearing, not cosmetic: senses exhaust in
/// reverse list order during a sweep, so the still-active senses are always
/// a prefix of the list.
pub(crate) fn normalize(senses: &[Sense]) -> Vec<Sense> {
    let mut senses: Vec<Sense> = senses.iter().filter(|s| s.range > 0.0).cloned().collect();
    senses.sort_by(|a, b| b.range.total_cmp(&a.range).then_with(|| a.name.cmp(&b.name)));
    senses
}
