//! Zoom resolution: requested tile → upstream candidates.
//!
//! [`resolve`] is deterministic and performs no I/O. Given the requested
//! address, the per-call [`RequestOptions`] and the source's
//! [`SourceCapabilities`], it produces the primary upstream address plus at
//! most one degraded-resolution candidate.
//!
//! # Algorithm
//!
//! 1. **Legacy scale quantization** (`legacy` and `z >= minzoom`): a display
//!    scale of `2^d` is served from `max(z - d, minzoom)` so that source tile
//!    size stays constant.
//! 2. **Overzoom**: a zoom deeper than `maxzoom` is clamped to `maxzoom`.
//! 3. **Degraded candidate**: `fillzoom` or `maskLevel`, when the primary zoom
//!    is deeper than the configured level.
//!
//! All coarse addresses are derived from the *original* request, never from
//! an intermediate one.

use crate::coord::TileAddress;
use crate::source::{DegradedResolutionPolicy, SourceCapabilities};
use crate::tile::RequestOptions;

/// Why a candidate address was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateReason {
    /// The requested zoom (possibly quantized by legacy scale).
    Direct,
    /// Clamped to the source's maximum zoom.
    Overzoom,
    /// Coarse substitute used when the primary tile is absent.
    Fillzoom,
    /// Coarse substitute used when drawing at primary resolution fails.
    MaskLevel,
}

/// An upstream address together with the reason it was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedCandidate {
    /// Address to fetch from the upstream.
    pub address: TileAddress,
    /// Which rule produced it.
    pub reason: CandidateReason,
}

/// Ordered candidates for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The tile the caller asked for.
    pub requested: TileAddress,
    /// First address to try.
    pub primary: ResolvedCandidate,
    /// Fallback address, if the source's policy provides one.
    pub degraded: Option<ResolvedCandidate>,
}

impl Resolution {
    /// The fillzoom candidate, if any.
    pub fn fillzoom(&self) -> Option<ResolvedCandidate> {
        self.degraded
            .filter(|candidate| candidate.reason == CandidateReason::Fillzoom)
    }

    /// The mask-level candidate, if any.
    pub fn mask_level(&self) -> Option<ResolvedCandidate> {
        self.degraded
            .filter(|candidate| candidate.reason == CandidateReason::MaskLevel)
    }

    /// All candidates in priority order.
    pub fn candidates(&self) -> Vec<ResolvedCandidate> {
        std::iter::once(self.primary).chain(self.degraded).collect()
    }
}

/// Resolve a requested tile against a source's capabilities.
///
/// # Arguments
///
/// * `requested` - Validated request address
/// * `options` - Per-call options (scale, legacy)
/// * `capabilities` - Source zoom range and degraded-resolution policy
pub fn resolve(
    requested: TileAddress,
    options: &RequestOptions,
    capabilities: &SourceCapabilities,
) -> Resolution {
    let z = requested.z();

    let mut bz = if options.legacy && z >= capabilities.minzoom {
        let d = options.scale().log2().round() as i32;
        (i32::from(z) - d).max(i32::from(capabilities.minzoom)) as u8
    } else {
        z
    };

    let mut reason = CandidateReason::Direct;
    if bz > capabilities.maxzoom {
        bz = capabilities.maxzoom;
        reason = CandidateReason::Overzoom;
    }

    let primary = ResolvedCandidate {
        address: requested.ancestor(bz),
        reason,
    };

    let degraded = match capabilities.policy {
        DegradedResolutionPolicy::Fillzoom(level) if bz > level => Some(ResolvedCandidate {
            address: requested.ancestor(level),
            reason: CandidateReason::Fillzoom,
        }),
        DegradedResolutionPolicy::MaskLevel(level) if bz > level => Some(ResolvedCandidate {
            address: requested.ancestor(level),
            reason: CandidateReason::MaskLevel,
        }),
        _ => None,
    };

    Resolution {
        requested,
        primary,
        degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(minzoom: u8, maxzoom: u8) -> SourceCapabilities {
        SourceCapabilities::new(minzoom, maxzoom)
    }

    fn addr(z: u8, x: u32, y: u32) -> TileAddress {
        TileAddress::new(z, x, y).unwrap()
    }

    #[test]
    fn test_direct_within_range() {
        let resolution = resolve(addr(1, 1, 0), &RequestOptions::default(), &caps(0, 2));

        assert_eq!(resolution.primary.address, addr(1, 1, 0));
        assert_eq!(resolution.primary.reason, CandidateReason::Direct);
        assert!(resolution.degraded.is_none());
        assert_eq!(resolution.candidates().len(), 1);
    }

    #[test]
    fn test_overzoom_clamps_to_maxzoom() {
        let resolution = resolve(addr(2, 0, 0), &RequestOptions::default(), &caps(0, 1));

        assert_eq!(resolution.primary.address, addr(1, 0, 0));
        assert_eq!(resolution.primary.reason, CandidateReason::Overzoom);
    }

    #[test]
    fn test_overzoom_uses_original_coordinates() {
        let resolution = resolve(addr(5, 31, 17), &RequestOptions::default(), &caps(0, 2));

        assert_eq!(resolution.primary.address, addr(2, 3, 2));
    }

    #[test]
    fn test_legacy_scale_two_steps_up_one_zoom() {
        let options = RequestOptions::default().with_scale(2.0).with_legacy(true);
        let resolution = resolve(addr(3, 2, 4), &options, &caps(0, 2));

        assert_eq!(resolution.primary.address, addr(2, 1, 2));
        assert_eq!(resolution.primary.reason, CandidateReason::Direct);
    }

    #[test]
    fn test_legacy_scale_never_below_minzoom() {
        let options = RequestOptions::default().with_scale(8.0).with_legacy(true);
        let resolution = resolve(addr(3, 7, 7), &options, &caps(2, 10));

        assert_eq!(resolution.primary.address, addr(2, 3, 3));
    }

    #[test]
    fn test_legacy_ignored_below_minzoom() {
        let options = RequestOptions::default().with_scale(4.0).with_legacy(true);
        let resolution = resolve(addr(1, 1, 1), &options, &caps(2, 10));

        assert_eq!(resolution.primary.address, addr(1, 1, 1));
    }

    #[test]
    fn test_non_legacy_scale_does_not_change_zoom() {
        let options = RequestOptions::default().with_scale(4.0);
        let resolution = resolve(addr(3, 2, 4), &options, &caps(0, 22));

        assert_eq!(resolution.primary.address, addr(3, 2, 4));
    }

    #[test]
    fn test_legacy_then_overzoom() {
        let options = RequestOptions::default().with_scale(2.0).with_legacy(true);
        let resolution = resolve(addr(4, 9, 9), &options, &caps(0, 2));

        assert_eq!(resolution.primary.address, addr(2, 2, 2));
        assert_eq!(resolution.primary.reason, CandidateReason::Overzoom);
    }

    #[test]
    fn test_fillzoom_candidate() {
        let caps = caps(0, 2).with_policy(DegradedResolutionPolicy::Fillzoom(1));
        let resolution = resolve(addr(2, 1, 1), &RequestOptions::default(), &caps);

        let fill = resolution.fillzoom().unwrap();
        assert_eq!(fill.address, addr(1, 0, 0));
        assert_eq!(fill.reason, CandidateReason::Fillzoom);
        assert!(resolution.mask_level().is_none());
        assert_eq!(resolution.candidates().len(), 2);
    }

    #[test]
    fn test_fillzoom_not_offered_at_or_below_level() {
        let caps = caps(0, 2).with_policy(DegradedResolutionPolicy::Fillzoom(1));
        let resolution = resolve(addr(1, 1, 1), &RequestOptions::default(), &caps);

        assert!(resolution.degraded.is_none());
    }

    #[test]
    fn test_mask_level_candidate() {
        let caps = caps(0, 2).with_policy(DegradedResolutionPolicy::MaskLevel(1));
        let resolution = resolve(addr(2, 1, 2), &RequestOptions::default(), &caps);

        let mask = resolution.mask_level().unwrap();
        assert_eq!(mask.address, addr(1, 0, 1));
        assert!(resolution.fillzoom().is_none());
    }

    #[test]
    fn test_degraded_candidate_compares_against_clamped_zoom() {
        // Request is deeper than fillzoom but the clamped zoom is not.
        let caps = caps(0, 1).with_policy(DegradedResolutionPolicy::Fillzoom(1));
        let resolution = resolve(addr(4, 3, 3), &RequestOptions::default(), &caps);

        assert_eq!(resolution.primary.reason, CandidateReason::Overzoom);
        assert!(resolution.degraded.is_none());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_overzoom_property(
                maxzoom in 0u8..=10,
                extra in 1u8..=8,
                x_raw in 0u32..262_144,
                y_raw in 0u32..262_144
            ) {
                let z = maxzoom + extra;
                let extent = 1u32 << z;
                let (x, y) = (x_raw % extent, y_raw % extent);
                let tile = TileAddress::new(z, x, y)?;

                let resolution = resolve(tile, &RequestOptions::default(), &caps(0, maxzoom));
                let shift = u32::from(z - maxzoom);

                prop_assert_eq!(resolution.primary.address.z(), maxzoom);
                prop_assert_eq!(resolution.primary.address.x(), x >> shift);
                prop_assert_eq!(resolution.primary.address.y(), y >> shift);
                prop_assert_eq!(resolution.primary.reason, CandidateReason::Overzoom);
            }

            #[test]
            fn test_legacy_scale_property(
                minzoom in 0u8..=4,
                z_offset in 0u8..=10,
                d in 0u8..=4,
                x_raw in 0u32..16_384,
                y_raw in 0u32..16_384
            ) {
                let z = minzoom + z_offset;
                let extent = 1u32 << z;
                let (x, y) = (x_raw % extent, y_raw % extent);
                let tile = TileAddress::new(z, x, y)?;
                let options = RequestOptions::default()
                    .with_scale(f64::from(1u32 << d))
                    .with_legacy(true);

                let resolution = resolve(tile, &options, &caps(minzoom, 22));
                let expected_z = z.saturating_sub(d).max(minzoom);
                let shift = u32::from(z - expected_z);

                prop_assert_eq!(resolution.primary.address.z(), expected_z);
                prop_assert_eq!(resolution.primary.address.x(), x >> shift);
                prop_assert_eq!(resolution.primary.address.y(), y >> shift);
            }

            #[test]
            fn test_candidates_are_ancestors_of_request(
                z in 0u8..=16,
                x_raw in 0u32..65_536,
                y_raw in 0u32..65_536,
                maxzoom in 0u8..=16,
                fill in 0u8..=16
            ) {
                let extent = 1u32 << z;
                let tile = TileAddress::new(z, x_raw % extent, y_raw % extent)?;
                let caps = caps(0, maxzoom).with_policy(DegradedResolutionPolicy::Fillzoom(fill));

                let resolution = resolve(tile, &RequestOptions::default(), &caps);

                for candidate in resolution.candidates() {
                    prop_assert!(candidate.address.z() <= z);
                    prop_assert_eq!(tile.ancestor(candidate.address.z()), candidate.address);
                }
            }
        }
    }
}
