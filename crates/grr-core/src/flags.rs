//! Classification flags attached to every commit match.

use bitflags::bitflags;

bitflags! {
    /// How a left commit relates to its right counterpart.
    ///
    /// Flags are additive: a loose match can also be present in the new
    /// upstream, a dropped commit can be reviewed, and so on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct MatchFlags: u8 {
        /// Both sides carry the very same commit id.
        const SAME_COMMIT = 1 << 0;
        /// Only the commit titles match; the patch changed.
        const LOOSE_MATCH = 1 << 1;
        /// The right commit predates the rebase (it is part of the new upstream).
        const PRESENT_IN_REBASE_ONTO = 1 << 2;
        /// No right commit matches the left one.
        const DROPPED = 1 << 3;
        /// The right commit has no left counterpart.
        const ADDED = 1 << 4;
        /// A reviewer has already inspected the pair.
        const REVIEWED = 1 << 5;
    }
}

/// Display information for a single flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub flag: MatchFlags,
    pub character: char,
    pub definition: &'static str,
}

/// Markers in display order.
pub const MARKERS: [Marker; 6] = [
    Marker {
        flag: MatchFlags::SAME_COMMIT,
        character: '=',
        definition: "Commits are the same",
    },
    Marker {
        flag: MatchFlags::LOOSE_MATCH,
        character: '≈',
        definition: "Commit patchid has changed",
    },
    Marker {
        flag: MatchFlags::PRESENT_IN_REBASE_ONTO,
        character: '⤶',
        definition: "Commit present in new upstream",
    },
    Marker {
        flag: MatchFlags::DROPPED,
        character: '✗',
        definition: "Commit dropped in rebase",
    },
    Marker {
        flag: MatchFlags::ADDED,
        character: '✚',
        definition: "Commit added in rebase",
    },
    Marker {
        flag: MatchFlags::REVIEWED,
        character: '✔',
        definition: "Commit already reviewed",
    },
];

impl MatchFlags {
    /// Markers for every flag set, in display order.
    pub fn markers(self) -> impl Iterator<Item = &'static Marker> {
        MARKERS.iter().filter(move |m| self.contains(m.flag))
    }

    /// Flag names, e.g. `["LOOSE_MATCH", "PRESENT_IN_REBASE_ONTO"]`.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_additive() {
        let flags = MatchFlags::LOOSE_MATCH | MatchFlags::PRESENT_IN_REBASE_ONTO;
        assert!(flags.contains(MatchFlags::LOOSE_MATCH));
        assert!(flags.contains(MatchFlags::PRESENT_IN_REBASE_ONTO));
        assert!(!flags.contains(MatchFlags::DROPPED));
        assert_eq!(flags.names(), vec!["LOOSE_MATCH", "PRESENT_IN_REBASE_ONTO"]);
    }

    #[test]
    fn test_markers_follow_display_order() {
        let flags = MatchFlags::REVIEWED | MatchFlags::SAME_COMMIT;
        let chars: String = flags.markers().map(|m| m.character).collect();
        assert_eq!(chars, "=✔");
        assert_eq!(MatchFlags::empty().markers().count(), 0);
    }

    #[test]
    fn test_flag_names_parse_back() {
        assert_eq!(
            MatchFlags::from_name("DROPPED"),
            Some(MatchFlags::DROPPED)
        );
        assert_eq!(MatchFlags::from_name("NOPE"), None);
    }
}
