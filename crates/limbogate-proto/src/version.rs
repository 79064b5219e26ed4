//! Supported protocol versions.
//!
//! Versions are ordinal-comparable: comparison follows release order,
//! not protocol number (snapshots broke protocol-number monotonicity
//! long ago). `Undefined` sorts below everything and is never supported.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! versions {
    ($(($variant:ident, $id:expr, $name:expr)),+ $(,)?) => {
        /// A Java Edition protocol version known to the limbo.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum Version {
            /// Placeholder before the handshake declares a version, or for
            /// protocol numbers this build does not know.
            Undefined,
            $($variant),+
        }

        impl Version {
            /// Every defined version, oldest first.
            pub const ALL: &'static [Version] = &[$(Version::$variant),+];

            /// Wire protocol number declared in the handshake.
            pub fn protocol_id(self) -> i32 {
                match self {
                    Version::Undefined => -1,
                    $(Version::$variant => $id),+
                }
            }

            /// Human-readable release name.
            pub fn display_name(self) -> &'static str {
                match self {
                    Version::Undefined => "undefined",
                    $(Version::$variant => $name),+
                }
            }

            /// Map a handshake protocol number back to a version.
            /// Unknown numbers yield `Undefined`.
            pub fn from_protocol_id(id: i32) -> Version {
                // Several releases share a protocol number; the first
                // (oldest) match is the canonical one.
                $(if $id == id { return Version::$variant; })+
                Version::Undefined
            }
        }
    };
}

versions! {
    (V1_7_2, 4, "1.7.2"),
    (V1_7_6, 5, "1.7.6"),
    (V1_8, 47, "1.8"),
    (V1_9, 107, "1.9"),
    (V1_9_1, 108, "1.9.1"),
    (V1_9_2, 109, "1.9.2"),
    (V1_9_4, 110, "1.9.4"),
    (V1_10, 210, "1.10"),
    (V1_11, 315, "1.11"),
    (V1_11_1, 316, "1.11.1"),
    (V1_12, 335, "1.12"),
    (V1_12_1, 338, "1.12.1"),
    (V1_12_2, 340, "1.12.2"),
    (V1_13, 393, "1.13"),
    (V1_13_1, 401, "1.13.1"),
    (V1_13_2, 404, "1.13.2"),
    (V1_14, 477, "1.14"),
    (V1_14_4, 498, "1.14.4"),
    (V1_15, 573, "1.15"),
    (V1_15_2, 578, "1.15.2"),
    (V1_16, 735, "1.16"),
    (V1_16_1, 736, "1.16.1"),
    (V1_16_2, 751, "1.16.2"),
    (V1_16_4, 754, "1.16.4"),
    (V1_17, 755, "1.17"),
    (V1_17_1, 756, "1.17.1"),
    (V1_18, 757, "1.18"),
    (V1_18_2, 758, "1.18.2"),
    (V1_19, 759, "1.19"),
    (V1_19_1, 760, "1.19.1"),
    (V1_19_3, 761, "1.19.3"),
    (V1_19_4, 762, "1.19.4"),
    (V1_20, 763, "1.20"),
    (V1_20_2, 764, "1.20.2"),
    (V1_20_3, 765, "1.20.3"),
    (V1_20_4, 765, "1.20.4"),
}

impl Version {
    /// Oldest supported version.
    pub const MIN: Version = Version::V1_7_2;
    /// Newest supported version.
    pub const MAX: Version = Version::V1_20_4;

    pub fn is_supported(self) -> bool {
        self != Version::Undefined
    }

    pub fn less(self, other: Version) -> bool {
        self < other
    }

    pub fn more_or_equal(self, other: Version) -> bool {
        self >= other
    }

    /// Inclusive release-order range test.
    pub fn from_to(self, min: Version, max: Version) -> bool {
        self >= min && self <= max
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.display_name(), self.protocol_id())
    }
}

/// Inclusive range of versions, used for registry registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Version,
    pub max: Version,
}

impl VersionRange {
    pub const ALL: VersionRange = VersionRange {
        min: Version::MIN,
        max: Version::MAX,
    };

    pub fn of(min: Version, max: Version) -> Self {
        Self { min, max }
    }

    pub fn single(version: Version) -> Self {
        Self {
            min: version,
            max: version,
        }
    }

    pub fn contains(&self, version: Version) -> bool {
        version.from_to(self.min, self.max)
    }

    /// Versions inside this range, oldest first.
    pub fn versions(&self) -> impl Iterator<Item = Version> + '_ {
        Version::ALL.iter().copied().filter(|v| self.contains(*v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_release_order() {
        assert!(Version::V1_7_2.less(Version::V1_8));
        assert!(Version::V1_16_2.less(Version::V1_16_4));
        assert!(Version::V1_20_4.more_or_equal(Version::V1_20_3));
        assert!(Version::V1_19_3.more_or_equal(Version::V1_19_3));
        assert!(!Version::V1_12_2.more_or_equal(Version::V1_13));
    }

    #[test]
    fn undefined_sorts_lowest_and_is_unsupported() {
        assert!(Version::Undefined < Version::V1_7_2);
        assert!(!Version::Undefined.is_supported());
        assert!(Version::V1_8.is_supported());
    }

    #[test]
    fn from_to_boundaries_are_inclusive_and_disjoint() {
        // A version on a boundary must fall into exactly one of two
        // adjacent windows.
        let v = Version::V1_16_1;
        let first = v.from_to(Version::V1_16, Version::V1_16_1);
        let second = v.from_to(Version::V1_16_2, Version::V1_18);
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn protocol_id_roundtrip() {
        for v in Version::ALL {
            let resolved = Version::from_protocol_id(v.protocol_id());
            // Shared protocol numbers resolve to the canonical entry,
            // which always reports the same number.
            assert_eq!(resolved.protocol_id(), v.protocol_id());
        }
        assert_eq!(Version::from_protocol_id(-42), Version::Undefined);
        assert_eq!(Version::from_protocol_id(763), Version::V1_20);
    }

    #[test]
    fn range_iteration() {
        let range = VersionRange::of(Version::V1_19, Version::V1_19_4);
        let versions: Vec<_> = range.versions().collect();
        assert_eq!(
            versions,
            vec![
                Version::V1_19,
                Version::V1_19_1,
                Version::V1_19_3,
                Version::V1_19_4
            ]
        );
        assert!(VersionRange::single(Version::V1_8).contains(Version::V1_8));
        assert!(!VersionRange::single(Version::V1_8).contains(Version::V1_9));
    }
}
