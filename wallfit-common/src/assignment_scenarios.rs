#[cfg(test)]
mod tests {
    use crate::catalog::{Catalog, Dimensions};
    use crate::filter::{aspect_mismatch_permille, filter};
    use crate::policy::{MultiMonitorMode, Policy};
    use crate::selector::{assign, assign_with_rng, Slot, SlotOutcome};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::PathBuf;

    const MODES: [MultiMonitorMode; 3] = [
        MultiMonitorMode::Different,
        MultiMonitorMode::Same,
        MultiMonitorMode::Whatever,
    ];

    fn mixed_catalog() -> Catalog {
        vec![
            ("/walls/hd-1.jpg", 1920, 1080),
            ("/walls/hd-2.jpg", 1920, 1080),
            ("/walls/uhd.jpg", 3840, 2160),
            ("/walls/small-hd.jpg", 1280, 720),
            ("/walls/ultrawide.jpg", 3440, 1440),
            ("/walls/almost-hd.jpg", 1930, 1080),
            ("/walls/square.jpg", 2000, 2000),
            ("/walls/portrait.jpg", 1440, 2560),
            ("/walls/qhd.jpg", 2560, 1440),
        ]
        .into_iter()
        .map(|(path, w, h)| (PathBuf::from(path), Dimensions::new(w, h)))
        .collect()
    }

    fn mixed_slots() -> Vec<Slot> {
        vec![
            Slot::new("DP-1", 1920, 1080),
            Slot::new("DP-2", 2560, 1440).with_current("/walls/qhd.jpg"),
            Slot::new("HDMI-A-1", 1440, 2560),
            Slot::new("eDP-1", 3440, 1440),
            Slot::new("DP-3", 1280, 1024),
        ]
    }

    fn all_policies() -> Vec<Policy> {
        let mut policies = Vec::new();
        for allow_upscaling in [false, true] {
            for max_aspect_mismatch in [0, 1, 6, 50, 300, 1000] {
                for multi_monitor in MODES {
                    policies.push(Policy {
                        allow_upscaling,
                        max_aspect_mismatch,
                        multi_monitor,
                    });
                }
            }
        }
        policies
    }

    #[test]
    fn test_assigned_images_respect_geometry_bounds() {
        let catalog = mixed_catalog();
        let slots = mixed_slots();

        for (seed, policy) in all_policies().iter().enumerate() {
            for force_change in [false, true] {
                let mut rng = StdRng::seed_from_u64(seed as u64);
                let assignment = assign_with_rng(&catalog, &slots, policy, force_change, &mut rng);

                for (slot_id, path) in assignment.changes() {
                    let slot = slots.iter().find(|s| s.id == slot_id).unwrap();
                    let image = catalog.get(path).unwrap();

                    assert!(
                        aspect_mismatch_permille(image, slot.dimensions()) < policy.max_aspect_mismatch as u64,
                        "{:?} on {} breaks the aspect bound under {:?}", path, slot_id, policy
                    );
                    if !policy.allow_upscaling {
                        assert!(image.width >= slot.width && image.height >= slot.height);
                    }
                }
            }
        }
    }

    #[test]
    fn test_slots_without_candidates_get_no_assignment() {
        let catalog = mixed_catalog();
        let slots = mixed_slots();

        for policy in all_policies() {
            let assignment = assign(&catalog, &slots, &policy, true);
            for slot in &slots {
                if filter(&catalog, slot, &policy).is_empty() {
                    assert_eq!(assignment.get(&slot.id), Some(&SlotOutcome::NoCandidate));
                }
            }
        }
    }

    #[test]
    fn test_eligible_current_image_is_kept_without_force() {
        let catalog = mixed_catalog();
        let policy = Policy {
            allow_upscaling: true,
            max_aspect_mismatch: 10,
            multi_monitor: MultiMonitorMode::Different,
        };
        let slots = vec![Slot::new("DP-1", 1920, 1080).with_current("/walls/hd-2.jpg")];

        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let assignment = assign_with_rng(&catalog, &slots, &policy, false, &mut rng);
            assert_eq!(assignment.get("DP-1"), Some(&SlotOutcome::Kept));
        }
    }

    #[test]
    fn test_different_mode_gives_distinct_images_when_pool_suffices() {
        let catalog = mixed_catalog();
        let policy = Policy {
            allow_upscaling: true,
            max_aspect_mismatch: 10,
            multi_monitor: MultiMonitorMode::Different,
        };
        // Five 16:9 images, four 16:9 outputs.
        let slots: Vec<_> = ["DP-1", "DP-2", "DP-3", "DP-4"]
            .iter()
            .map(|id| Slot::new(*id, 1920, 1080))
            .collect();

        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let assignment = assign_with_rng(&catalog, &slots, &policy, true, &mut rng);
            let chosen: std::collections::BTreeSet<_> = assignment.changes().map(|(_, p)| p).collect();
            assert_eq!(chosen.len(), slots.len());
        }
    }

    #[test]
    fn test_same_mode_draws_from_used_images_when_possible() {
        let catalog = mixed_catalog();
        let policy = Policy {
            allow_upscaling: true,
            max_aspect_mismatch: 10,
            multi_monitor: MultiMonitorMode::Same,
        };
        let slots = vec![
            Slot::new("DP-1", 1920, 1080),
            Slot::new("DP-2", 2560, 1440),
            Slot::new("DP-3", 3840, 2160),
        ];

        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let assignment = assign_with_rng(&catalog, &slots, &policy, true, &mut rng);
            let first = assignment.get("DP-1").cloned();
            assert_eq!(assignment.get("DP-2").cloned(), first);
            assert_eq!(assignment.get("DP-3").cloned(), first);
        }
    }

    #[test]
    fn test_repeated_unforced_runs_settle() {
        let catalog = mixed_catalog();
        let policy = Policy {
            allow_upscaling: true,
            max_aspect_mismatch: 10,
            multi_monitor: MultiMonitorMode::Different,
        };
        let mut slots = vec![Slot::new("DP-1", 1920, 1080), Slot::new("DP-2", 1920, 1080)];
        let mut rng = StdRng::seed_from_u64(42);

        // Apply the first run, then every later run must keep everything.
        let first = assign_with_rng(&catalog, &slots, &policy, false, &mut rng);
        for (slot_id, path) in first.changes() {
            let slot = slots.iter_mut().find(|s| s.id == slot_id).unwrap();
            slot.current = Some(path.to_path_buf());
        }

        for _ in 0..10 {
            let again = assign_with_rng(&catalog, &slots, &policy, false, &mut rng);
            assert_eq!(again.changes().count(), 0);
            assert!(again.decisions().iter().all(|d| d.outcome == SlotOutcome::Kept));
        }
    }

    #[test]
    fn test_scenario_upscaling_leaves_single_match() {
        let catalog: Catalog = vec![
            (PathBuf::from("A"), Dimensions::new(1920, 1080)),
            (PathBuf::from("B"), Dimensions::new(1000, 1000)),
        ]
        .into_iter()
        .collect();
        let policy = Policy {
            allow_upscaling: false,
            max_aspect_mismatch: 50,
            multi_monitor: MultiMonitorMode::Different,
        };
        let slots = vec![Slot::new("monitor", 1920, 1080)];

        assert_eq!(filter(&catalog, &slots[0], &policy).len(), 1);
        let assignment = assign(&catalog, &slots, &policy, false);
        assert_eq!(assignment.get("monitor"), Some(&SlotOutcome::Assigned(PathBuf::from("A"))));
    }

    #[test]
    fn test_scenario_two_monitors_receive_both_images() {
        let catalog: Catalog = vec![
            (PathBuf::from("A"), Dimensions::new(1920, 1080)),
            (PathBuf::from("B"), Dimensions::new(1920, 1080)),
        ]
        .into_iter()
        .collect();
        let policy = Policy {
            allow_upscaling: false,
            max_aspect_mismatch: 50,
            multi_monitor: MultiMonitorMode::Different,
        };
        let slots = vec![Slot::new("left", 1920, 1080), Slot::new("right", 1920, 1080)];

        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let assignment = assign_with_rng(&catalog, &slots, &policy, true, &mut rng);
            let mut chosen: Vec<_> = assignment.changes().map(|(_, p)| p.to_path_buf()).collect();
            chosen.sort();
            assert_eq!(chosen, vec![PathBuf::from("A"), PathBuf::from("B")]);
        }
    }

    #[test]
    fn test_scenario_current_image_is_kept() {
        let catalog: Catalog = vec![
            (PathBuf::from("A"), Dimensions::new(1920, 1080)),
            (PathBuf::from("B"), Dimensions::new(1920, 1080)),
            (PathBuf::from("C"), Dimensions::new(1920, 1080)),
        ]
        .into_iter()
        .collect();
        let policy = Policy {
            allow_upscaling: false,
            max_aspect_mismatch: 50,
            multi_monitor: MultiMonitorMode::Whatever,
        };
        let slots = vec![Slot::new("monitor", 1920, 1080).with_current("C")];

        let assignment = assign(&catalog, &slots, &policy, false);
        assert_eq!(assignment.get("monitor"), Some(&SlotOutcome::Kept));
    }
}
