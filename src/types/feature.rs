//! Profiling features and feature bitmasks

use serde::{Deserialize, Serialize};

/// A named category of profiling data.
///
/// The discriminant is the bit position inside a [`FeatureSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Feature {
    JavaScript = 0,
    MemoryUsage = 1,
    PixmapCache = 2,
    SceneGraph = 3,
    Animations = 4,
    Painting = 5,
    Compiling = 6,
    Creating = 7,
    Binding = 8,
    HandlingSignal = 9,
    InputEvents = 10,
    DebugMessages = 11,
}

/// Display names, indexed by `Feature as usize`
static FEATURE_NAMES: [&str; Feature::COUNT] = [
    "JavaScript",
    "Memory Usage",
    "Pixmap Cache",
    "Scene Graph",
    "Animations",
    "Painting",
    "Compiling",
    "Creating",
    "Binding",
    "Handling Signal",
    "Input Events",
    "Debug Messages",
];

impl Feature {
    /// Number of known features
    pub const COUNT: usize = 12;

    /// All features in bit order
    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::JavaScript,
        Feature::MemoryUsage,
        Feature::PixmapCache,
        Feature::SceneGraph,
        Feature::Animations,
        Feature::Painting,
        Feature::Compiling,
        Feature::Creating,
        Feature::Binding,
        Feature::HandlingSignal,
        Feature::InputEvents,
        Feature::DebugMessages,
    ];

    /// Look a feature up by its bit position
    pub fn from_bit(bit: u32) -> Option<Feature> {
        Self::ALL.get(bit as usize).copied()
    }

    /// Bit mask with only this feature set
    pub fn mask(self) -> u64 {
        1u64 << (self as u8)
    }

    /// Human readable name of the feature
    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self as usize]
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bitmask over [`Feature`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(u64);

impl FeatureSet {
    pub const EMPTY: FeatureSet = FeatureSet(0);

    /// Build a set from a raw mask. Bits beyond the known features are kept
    /// so that traces written by newer producers survive a round trip.
    pub const fn from_bits(bits: u64) -> Self {
        FeatureSet(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, feature: Feature) -> bool {
        self.0 & feature.mask() != 0
    }

    /// True when every bit of `other` is also set in `self`
    pub fn contains_all(self, other: FeatureSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, feature: Feature) {
        self.0 |= feature.mask();
    }

    pub fn remove(&mut self, feature: Feature) {
        self.0 &= !feature.mask();
    }

    pub fn union(self, other: FeatureSet) -> FeatureSet {
        FeatureSet(self.0 | other.0)
    }

    pub fn difference(self, other: FeatureSet) -> FeatureSet {
        FeatureSet(self.0 & !other.0)
    }

    /// Known features contained in the set, in bit order
    pub fn iter(self) -> impl Iterator<Item = Feature> {
        Feature::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl From<Feature> for FeatureSet {
    fn from(feature: Feature) -> Self {
        FeatureSet(feature.mask())
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        let mut set = FeatureSet::EMPTY;
        for feature in iter {
            set.insert(feature);
        }
        set
    }
}

impl std::ops::BitOr for FeatureSet {
    type Output = FeatureSet;

    fn bitor(self, rhs: FeatureSet) -> FeatureSet {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for FeatureSet {
    fn bitor_assign(&mut self, rhs: FeatureSet) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_follow_bit_order() {
        assert_eq!(Feature::JavaScript.name(), "JavaScript");
        assert_eq!(Feature::HandlingSignal.name(), "Handling Signal");
        assert_eq!(Feature::DebugMessages.name(), "Debug Messages");
        for (bit, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(Feature::from_bit(bit as u32), Some(*feature));
        }
        assert_eq!(Feature::from_bit(12), None);
    }

    #[test]
    fn test_feature_set_operations() {
        let mut set = FeatureSet::from(Feature::JavaScript) | FeatureSet::from(Feature::Binding);
        assert!(set.contains(Feature::JavaScript));
        assert!(set.contains(Feature::Binding));
        assert!(!set.contains(Feature::Painting));
        assert_eq!(set.bits(), 0b1_0000_0001);

        set.remove(Feature::JavaScript);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Feature::Binding]);

        let all: FeatureSet = Feature::ALL.into_iter().collect();
        assert!(all.contains_all(set));
        assert_eq!(all.difference(set).iter().count(), Feature::COUNT - 1);
    }

    #[test]
    fn test_feature_set_serializes_as_mask() {
        let set = FeatureSet::from(Feature::MemoryUsage);
        assert_eq!(serde_json::to_string(&set).unwrap(), "2");
        let back: FeatureSet = serde_json::from_str("2").unwrap();
        assert_eq!(back, set);
    }
}
