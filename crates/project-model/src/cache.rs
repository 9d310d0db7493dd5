//! Per-segment re-encode cache.
//!
//! Each entry pairs a speed-curved clip with the fingerprint of the inputs that
//! produced it. An entry is only honored while the segment still hashes to the
//! same fingerprint.

use std::collections::BTreeMap;
use std::fmt;

use crate::easing::EasingSpec;
use crate::media::EncodedClip;
use crate::segment::{Segment, SegmentId};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a hash of a segment's duration, easing spec, and source identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheFingerprint(pub u64);

impl CacheFingerprint {
    pub fn of(segment: &Segment) -> Self {
        let mut hasher = Fnv1a::new();
        hasher.write(&segment.target_duration_us().to_le_bytes());
        match segment.easing() {
            EasingSpec::Preset(preset) => {
                hasher.write(&[0]);
                hasher.write(preset.name().as_bytes());
            }
            EasingSpec::Bezier(points) => {
                hasher.write(&[1]);
                for value in points {
                    hasher.write(&value.to_bits().to_le_bytes());
                }
            }
        }
        hasher.write(&[0xff]);
        hasher.write(segment.source.identity().as_bytes());
        Self(hasher.finish())
    }
}

impl fmt::Display for CacheFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Self(FNV_OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// A speed-curved clip and the fingerprint it was derived under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedClip {
    pub clip: EncodedClip,
    pub fingerprint: CacheFingerprint,
}

/// Segment id → cached speed-curved clip.
#[derive(Debug, Clone, Default)]
pub struct SpeedCurvedCache {
    entries: BTreeMap<SegmentId, CachedClip>,
}

impl SpeedCurvedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Raw lookup, ignoring fingerprints.
    pub fn get(&self, id: SegmentId) -> Option<&CachedClip> {
        self.entries.get(&id)
    }

    /// The cached clip for `segment`, only if its fingerprint still matches.
    pub fn get_valid(&self, segment: &Segment) -> Option<&EncodedClip> {
        let entry = self.entries.get(&segment.id)?;
        (entry.fingerprint == CacheFingerprint::of(segment)).then_some(&entry.clip)
    }

    /// Store `clip` for `segment` under the segment's current fingerprint.
    pub fn insert(&mut self, segment: &Segment, clip: EncodedClip) {
        self.entries.insert(
            segment.id,
            CachedClip {
                clip,
                fingerprint: CacheFingerprint::of(segment),
            },
        );
    }

    /// Drop one entry. Returns whether anything was removed.
    pub fn invalidate(&mut self, id: SegmentId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keep only entries whose id satisfies `keep`; returns the dropped ids.
    pub fn retain(&mut self, mut keep: impl FnMut(SegmentId) -> bool) -> Vec<SegmentId> {
        let dropped: Vec<SegmentId> = self
            .entries
            .keys()
            .copied()
            .filter(|id| !keep(*id))
            .collect();
        for id in &dropped {
            self.entries.remove(id);
        }
        dropped
    }

    pub fn ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.entries.keys().copied()
    }
}
