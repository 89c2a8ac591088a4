//! Per-output image assignment.
//!
//! One call to [`assign`] is one run: every slot is filtered against the
//! catalog, the multi-monitor policy reshapes the candidate pool using the
//! images already chosen earlier in the same run, and a uniform random pick
//! breaks the remaining tie. Slots are processed in the order given, so that
//! order influences which images count as used for later slots.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use rand::seq::IteratorRandom;
use rand::Rng;
use crate::catalog::{Catalog, Dimensions};
use crate::filter::filter;
use crate::policy::{MultiMonitorMode, Policy};

/// One display target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Image currently shown, if known.
    pub current: Option<PathBuf>,
}

impl Slot {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            current: None,
        }
    }

    pub fn with_current(mut self, current: impl Into<PathBuf>) -> Self {
        self.current = Some(current.into());
        self
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// Show this image.
    Assigned(PathBuf),
    /// The current image is still acceptable; leave it.
    Kept,
    /// Nothing in the catalog fits; leave whatever is shown.
    NoCandidate,
}

impl std::fmt::Display for SlotOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotOutcome::Assigned(path) => write!(f, "assigned {}", path.display()),
            SlotOutcome::Kept => write!(f, "kept"),
            SlotOutcome::NoCandidate => write!(f, "no candidate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDecision {
    pub slot: String,
    pub outcome: SlotOutcome,
    /// Size of the filtered pool before any policy reshaping.
    pub eligible: usize,
}

/// Result of one run, in slot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    decisions: Vec<SlotDecision>,
}

impl Assignment {
    pub fn get(&self, slot: &str) -> Option<&SlotOutcome> {
        self.decisions
            .iter()
            .find(|decision| decision.slot == slot)
            .map(|decision| &decision.outcome)
    }

    pub fn decisions(&self) -> &[SlotDecision] {
        &self.decisions
    }

    /// Slots that need a new image, with that image.
    pub fn changes(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.decisions.iter().filter_map(|decision| match &decision.outcome {
            SlotOutcome::Assigned(path) => Some((decision.slot.as_str(), path.as_path())),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Assigns images to `slots` using a thread-local random source.
pub fn assign(catalog: &Catalog, slots: &[Slot], policy: &Policy, force_change: bool) -> Assignment {
    assign_with_rng(catalog, slots, policy, force_change, &mut rand::thread_rng())
}

pub fn assign_with_rng<R: Rng + ?Sized>(
    catalog: &Catalog,
    slots: &[Slot],
    policy: &Policy,
    force_change: bool,
    rng: &mut R,
) -> Assignment {
    let mut used: BTreeSet<&Path> = BTreeSet::new();
    let mut decisions = Vec::with_capacity(slots.len());

    for slot in slots {
        let candidates = filter(catalog, slot, policy);
        let eligible = candidates.len();
        let outcome = select(candidates, slot, policy, force_change, &mut used, rng);

        log::debug!("{}: {} eligible, {}", slot.id, eligible, outcome);
        decisions.push(SlotDecision {
            slot: slot.id.clone(),
            outcome,
            eligible,
        });
    }

    Assignment { decisions }
}

fn select<'a, R: Rng + ?Sized>(
    mut candidates: BTreeSet<&'a Path>,
    slot: &Slot,
    policy: &Policy,
    force_change: bool,
    used: &mut BTreeSet<&'a Path>,
    rng: &mut R,
) -> SlotOutcome {
    if candidates.len() <= 1 {
        return match candidates.pop_first() {
            Some(only) => {
                used.insert(only);
                SlotOutcome::Assigned(only.to_path_buf())
            }
            None => SlotOutcome::NoCandidate,
        };
    }

    if let Some(current) = slot.current.as_deref() {
        if candidates.remove(current) && !force_change {
            return SlotOutcome::Kept;
        }
    }

    match policy.multi_monitor {
        MultiMonitorMode::Different => {
            let unused: BTreeSet<&Path> = candidates.difference(used).copied().collect();
            // When every candidate is already in use the pool stays as is:
            // a repeat is better than leaving the slot unassigned. This falls
            // back to the slot's own candidates rather than to all of `used`,
            // so the current image and ineligible images stay out.
            if !unused.is_empty() {
                candidates = unused;
            }
        }
        MultiMonitorMode::Same => {
            let shared: BTreeSet<&Path> = candidates.intersection(used).copied().collect();
            if !shared.is_empty() {
                candidates = shared;
            }
        }
        MultiMonitorMode::Whatever => {}
    }

    match candidates.iter().choose(rng) {
        Some(&choice) => {
            used.insert(choice);
            SlotOutcome::Assigned(choice.to_path_buf())
        }
        None => SlotOutcome::NoCandidate,
    }
}
