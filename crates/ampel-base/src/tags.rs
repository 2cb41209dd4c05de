// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed tag enumeration and the process-wide tag registry.
//!
//! Every [`Tag`] has a stable numeric identity: the first seven bytes of
//! `blake3(name)` read as a little-endian integer. The registry is built once,
//! checks that no two names share an identity and is sealed afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use blake3::Hasher;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::frozen::{Freezable, ImmutabilityError};

/// Number of digest bytes kept for a tag identity.
pub const TAG_ID_BYTES: usize = 7;

/// Numeric identity of a tag name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct TagId(pub u64);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#016x}", self.0)
    }
}

/// Computes the identity of `name`.
#[must_use]
pub fn tag_id(name: &str) -> TagId {
    let mut hasher = Hasher::new();
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut buf = [0_u8; 8];
    buf[..TAG_ID_BYTES].copy_from_slice(&digest.as_bytes()[..TAG_ID_BYTES]);
    TagId(u64::from_le_bytes(buf))
}

/// Family a tag belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagGroup {
    /// Processing outcome flags.
    General,
    /// Flags attached to individual data points.
    Data,
    /// Flags attached to compounds.
    Compound,
    /// Flags attached to whole transients.
    Transient,
}

impl TagGroup {
    /// Lowercase group name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Data => "data",
            Self::Compound => "compound",
            Self::Transient => "transient",
        }
    }
}

macro_rules! declare_tags {
    ($( $group:ident => { $( $(#[$doc:meta])* $name:ident = $label:literal ),* $(,)? } )*) => {
        /// Statically declared tag set.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Tag {
            $( $( $(#[$doc])* $name, )* )*
        }

        impl Tag {
            /// Every tag in declaration order.
            pub const ALL: &[Tag] = &[ $( $( Tag::$name, )* )* ];

            /// Registered name of the tag.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $( $( Tag::$name => $label, )* )*
                }
            }

            /// Group the tag was declared in.
            #[must_use]
            pub const fn group(self) -> TagGroup {
                match self {
                    $( $( Tag::$name => TagGroup::$group, )* )*
                }
            }
        }
    };
}

declare_tags! {
    General => {
        /// A unit reported an error while processing.
        HasError = "HAS_ERROR",
        /// A unit raised an exception while processing.
        HasException = "HAS_EXCEPTION",
    }
    Data => {
        /// Superseded by a reprocessed data point.
        Superseded = "SUPERSEDED",
        /// Image flagged as badly calibrated.
        ImageBadCalibration = "IMAGE_BAD_CALIBRATION",
        /// Image flagged as containing an artifact.
        ImageArtifact = "IMAGE_ARTIFACT",
        /// Image flagged with a tracking problem.
        ImageTrackingPblm = "IMAGE_TRACKING_PBLM",
        /// Image flagged with a focus problem.
        ImageFocusPblm = "IMAGE_FOCUS_PBLM",
        /// Zero point updated after ingestion.
        HasUpdatedZp = "HAS_UPDATED_ZP",
        /// Data point produced by the framework rather than the instrument.
        CreatedByAmpel = "CREATED_BY_AMPEL",
        /// Detection.
        Photopoint = "PHOTOPOINT",
        /// Non-detection (upper limit).
        Upperlimit = "UPPERLIMIT",
    }
    Compound => {
        /// Compound references upper limits.
        HasUpperLimits = "HAS_UPPER_LIMITS",
        /// Photometry was completed from an external source.
        HasAutocompletedPhoto = "HAS_AUTOCOMPLETED_PHOTO",
        /// Superseded points were present.
        HasSupersededPps = "HAS_SUPERSEDED_PPS",
        /// Some points were excluded.
        HasExcludedPps = "HAS_EXCLUDED_PPS",
        /// Points were excluded manually.
        HasManualExclusion = "HAS_MANUAL_EXCLUSION",
        /// Points were excluded for data-right reasons.
        HasDatarightExclusion = "HAS_DATARIGHT_EXCLUSION",
        /// Channel specific policies applied.
        HasCustomPolicies = "HAS_CUSTOM_POLICIES",
    }
    Transient => {
        /// A TNS name is known.
        HasTnsName = "HAS_TNS_NAME",
        /// Photometry from more than one instrument.
        MixedDataSource = "MIXED_DATA_SOURCE",
        /// T1 completed the photometry automatically.
        T1AutoCompleted = "T1_AUTO_COMPLETED",
    }
}

impl Tag {
    /// Looks a tag up by its registered name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Numeric identity of the tag.
    #[must_use]
    pub fn id(self) -> TagId {
        tag_id(self.name())
    }

    /// Tags belonging to `group`, in declaration order.
    pub fn in_group(group: TagGroup) -> impl Iterator<Item = Self> {
        Self::ALL.iter().copied().filter(move |t| t.group() == group)
    }

    const fn bit(self) -> u64 {
        1_u64 << (self as u8)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Compact set of [`Tag`]s stored as one bit per declared tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TagSet(u64);

impl TagSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Adds `tag`; returns `true` if it was not present.
    pub fn insert(&mut self, tag: Tag) -> bool {
        let fresh = !self.contains(tag);
        self.0 |= tag.bit();
        fresh
    }

    /// Removes `tag`; returns `true` if it was present.
    pub fn remove(&mut self, tag: Tag) -> bool {
        let present = self.contains(tag);
        self.0 &= !tag.bit();
        present
    }

    /// Membership test.
    #[must_use]
    pub const fn contains(self, tag: Tag) -> bool {
        self.0 & tag.bit() != 0
    }

    /// Number of members.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Whether the set has no members.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Tag> {
        Tag::ALL.iter().copied().filter(move |t| self.contains(*t))
    }

    /// Raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len() as usize))?;
        for tag in self.iter() {
            seq.serialize_element(&tag)?;
        }
        seq.end()
    }
}

/// Errors raised while building the tag registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// Two distinct names hash to the same identity.
    #[error("tag {incoming} collides with {existing} (id {id})")]
    Collision {
        /// Name already holding the identity.
        existing: String,
        /// Name that produced the same identity.
        incoming: String,
        /// Shared identity.
        id: TagId,
    },
    /// Registration attempted after the registry was sealed.
    #[error("tag registry is sealed; cannot register {name}")]
    Sealed {
        /// Name that was refused.
        name: String,
    },
}

impl From<(ImmutabilityError, &str)> for TagError {
    fn from((_, name): (ImmutabilityError, &str)) -> Self {
        Self::Sealed {
            name: name.to_owned(),
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    by_name: BTreeMap<String, TagId>,
    by_id: BTreeMap<TagId, String>,
}

/// Name to identity mapping with collision checking.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tables: Freezable<Tables>,
}

impl TagRegistry {
    /// Creates an empty, unsealed registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a batch of names atomically.
    ///
    /// Re-registering a name yields the same identity and is a no-op. If any
    /// name in the batch collides with a different registered name (or with
    /// another name in the same batch) nothing is registered.
    pub fn register<'a, I>(&mut self, names: I) -> Result<(), TagError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut staged: BTreeMap<TagId, &str> = BTreeMap::new();
        for name in names {
            let id = tag_id(name);
            let known = self
                .tables
                .by_id
                .get(&id)
                .map(String::as_str)
                .or_else(|| staged.get(&id).copied());
            match known {
                Some(existing) if existing == name => {}
                Some(existing) => {
                    return Err(TagError::Collision {
                        existing: existing.to_owned(),
                        incoming: name.to_owned(),
                        id,
                    });
                }
                None => {
                    staged.insert(id, name);
                }
            }
        }
        let Some(first) = staged.values().next().copied() else {
            return Ok(());
        };
        self.tables
            .update(|tables| {
                for (id, name) in &staged {
                    tables.by_name.insert((*name).to_owned(), *id);
                    tables.by_id.insert(*id, (*name).to_owned());
                }
            })
            .map_err(|err| TagError::from((err, first)))?;
        debug!(count = staged.len(), "registered tags");
        Ok(())
    }

    /// Rejects any further registration.
    pub fn seal(&mut self) {
        self.tables.freeze();
    }

    /// Whether the registry has been sealed.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.tables.is_frozen()
    }

    /// Identity registered for `name`.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<TagId> {
        self.tables.by_name.get(name).copied()
    }

    /// Name registered for `id`.
    #[must_use]
    pub fn name_of(&self, id: TagId) -> Option<&str> {
        self.tables.by_id.get(&id).map(String::as_str)
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.by_name.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.by_name.is_empty()
    }

    /// Registered `(name, id)` pairs sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, TagId)> {
        self.tables.by_name.iter().map(|(n, id)| (n.as_str(), *id))
    }
}

static REGISTRY: OnceLock<Result<TagRegistry, TagError>> = OnceLock::new();

/// The sealed registry of every declared [`Tag`], built on first access.
///
/// A collision among the declared names is reported on every call; callers
/// are expected to treat it as fatal at startup.
pub fn registry() -> Result<&'static TagRegistry, TagError> {
    REGISTRY
        .get_or_init(|| {
            let mut reg = TagRegistry::new();
            reg.register(Tag::ALL.iter().map(|t| t.name()))?;
            reg.seal();
            Ok(reg)
        })
        .as_ref()
        .map_err(Clone::clone)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn declared_tags_have_distinct_identities() {
        let reg = registry().unwrap();
        assert_eq!(reg.len(), Tag::ALL.len());
        let ids: BTreeSet<TagId> = Tag::ALL.iter().map(|t| t.id()).collect();
        assert_eq!(ids.len(), Tag::ALL.len());
        assert!(reg.is_sealed());
    }

    #[test]
    fn identity_fits_in_seven_bytes() {
        for tag in Tag::ALL {
            assert!(tag.id().0 < (1_u64 << 56), "{tag} overflows");
        }
    }

    #[test]
    fn re_registration_is_idempotent() {
        let mut reg = TagRegistry::new();
        reg.register(["A", "B"]).unwrap();
        let before: Vec<_> = reg.entries().map(|(n, id)| (n.to_owned(), id)).collect();
        reg.register(["B", "A"]).unwrap();
        let after: Vec<_> = reg.entries().map(|(n, id)| (n.to_owned(), id)).collect();
        assert_eq!(before, after);
        assert_eq!(reg.id_of("A"), Some(tag_id("A")));
        assert_eq!(reg.name_of(tag_id("B")), Some("B"));
    }

    #[test]
    fn sealed_registry_refuses_new_names() {
        let mut reg = TagRegistry::new();
        reg.register(["A"]).unwrap();
        reg.seal();
        assert_eq!(
            reg.register(["C"]),
            Err(TagError::Sealed { name: "C".into() })
        );
        assert!(reg.register(["A"]).is_ok());
    }

    #[test]
    fn groups_partition_the_enumeration() {
        let total: usize = [
            TagGroup::General,
            TagGroup::Data,
            TagGroup::Compound,
            TagGroup::Transient,
        ]
        .into_iter()
        .map(|g| Tag::in_group(g).count())
        .sum();
        assert_eq!(total, Tag::ALL.len());
        assert_eq!(Tag::Upperlimit.group(), TagGroup::Data);
        assert_eq!(Tag::from_name("HAS_TNS_NAME"), Some(Tag::HasTnsName));
    }

    #[test]
    fn tag_set_membership() {
        let mut set: TagSet = [Tag::Photopoint, Tag::Superseded].into_iter().collect();
        assert!(set.contains(Tag::Photopoint));
        assert!(!set.insert(Tag::Photopoint));
        assert!(set.remove(Tag::Superseded));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Tag::Photopoint]);
        assert_eq!(
            serde_json::to_value(set).unwrap(),
            serde_json::json!(["PHOTOPOINT"])
        );
    }
}
