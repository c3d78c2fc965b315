use std::collections::HashSet;

use findit_types::Challenge;

/// Trim and lowercase a label so comparisons ignore case and stray whitespace
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// A set of labels normalized once on construction.
///
/// Both sides of a match are `LabelSet`s: the labels the detector returned for
/// a photo and the variants a challenge accepts. Matching is a set
/// intersection, so no per-comparison lowercasing happens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: HashSet<String>,
}

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels
            .into_iter()
            .map(|label| normalize_label(label.as_ref()))
            .filter(|label| !label.is_empty())
            .collect();

        Self { labels }
    }

    /// Accepted variants of a challenge
    pub fn variants_of(challenge: &Challenge) -> Self {
        Self::new(&challenge.variants)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(&normalize_label(label))
    }

    /// True when any label here is also in `variants`
    pub fn matches_any(&self, variants: &LabelSet) -> bool {
        !self.labels.is_disjoint(&variants.labels)
    }
}
