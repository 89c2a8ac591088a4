//! Geometric eligibility of catalog images for a single slot.

use std::collections::BTreeSet;
use std::path::Path;
use crate::catalog::{Catalog, Dimensions};
use crate::policy::Policy;
use crate::selector::Slot;

/// Relative aspect-ratio deviation of `image` from `slot`, in parts per
/// thousand, rounded down.
pub fn aspect_mismatch_permille(image: Dimensions, slot: Dimensions) -> u64 {
    let (numerator, denominator) = mismatch_fraction(image, slot);
    u64::try_from(1000 * numerator / denominator).unwrap_or(u64::MAX)
}

/// `|iw/ih - sw/sh| / (sw/sh)` reduces to `|iw*sh - sw*ih| / (sw*ih)`.
fn mismatch_fraction(image: Dimensions, slot: Dimensions) -> (u128, u128) {
    debug_assert!(image.height > 0 && slot.height > 0, "zero height reached the filter");

    let image_cross = image.width as u128 * slot.height as u128;
    let slot_cross = slot.width as u128 * image.height as u128;
    (image_cross.abs_diff(slot_cross), slot_cross.max(1))
}

pub fn is_eligible(image: Dimensions, slot: Dimensions, policy: &Policy) -> bool {
    if !policy.allow_upscaling && (image.width < slot.width || image.height < slot.height) {
        return false;
    }

    // Exact comparison: a mismatch equal to the threshold is rejected.
    let (numerator, denominator) = mismatch_fraction(image, slot);
    1000 * numerator < policy.max_aspect_mismatch as u128 * denominator
}

/// Returns the catalog images acceptable for `slot` under `policy`.
pub fn filter<'a>(catalog: &'a Catalog, slot: &Slot, policy: &Policy) -> BTreeSet<&'a Path> {
    let target = slot.dimensions();
    catalog
        .iter()
        .filter(|(_, dims)| is_eligible(*dims, target, policy))
        .map(|(path, _)| path)
        .collect()
}
