//! End-to-end structural change scenarios.

mod common;

use std::collections::HashSet;

use common::{Health, Label, Sprite};
use flex_component::{Component, EntityId, QueryDescriptor};
use flex_ecs::{EcsError, QueryInvalidation, Scene, SceneConfig};
use flex_math::Position;

fn position(x: f32, y: f32) -> Position {
    Position::new(x, y, 0.0)
}

#[test]
fn test_create_migrate_destroy() {
    let mut scene = Scene::new();
    let e = scene.create_empty_entity();
    let img = scene.intern("img");

    scene.add_component(e, position(0.0, 0.0)).unwrap();
    scene.add_component(e, Sprite { sprite_handle: img }).unwrap();
    assert!(scene.cached_query::<(Position, Sprite)>().contains(e));

    scene.remove_component::<Position>(e).unwrap();
    assert!(!scene.cached_query::<(Position, Sprite)>().contains(e));
    assert!(scene.cached_query::<(Sprite,)>().contains(e));
    assert_eq!(
        scene.try_get_component::<Sprite>(e).map(|s| s.sprite_handle),
        Some(img)
    );

    scene.destroy_entity(e).unwrap();
    assert!(scene.entity_record(e).is_none());
    assert!(!scene.cached_query::<(Sprite,)>().contains(e));
    assert!(!scene.cached_query::<(Position, Sprite)>().contains(e));
    assert!(scene.query(&QueryDescriptor::new()).is_empty());
    assert!(scene.is_consistent());
}

#[test]
fn test_clone_preserves_data() {
    let mut scene = Scene::new();
    let e1 = scene.create_entity(Some("Original"));
    scene.add_component(e1, position(1.0, 2.0)).unwrap();
    scene.add_component(e1, Health { current: 10 }).unwrap();

    let e2 = scene.clone_entity(e1).unwrap();
    assert_ne!(e1, e2);
    assert_eq!(scene.try_get_component::<Position>(e2), Some(&position(1.0, 2.0)));
    assert_eq!(scene.try_get_component::<Health>(e2), Some(&Health { current: 10 }));
    assert_eq!(scene.entity_name(e2), Some("Original"));

    scene
        .get_component_mut::<Position>(e1)
        .unwrap()
        .unwrap()
        .position
        .x = 50.0;
    assert_eq!(scene.try_get_component::<Position>(e2), Some(&position(1.0, 2.0)));
    assert_eq!(
        scene.try_get_component::<Position>(e1).map(|p| p.position.x),
        Some(50.0)
    );
}

#[test]
fn test_clone_of_heap_component_is_deep() {
    let mut scene = Scene::new();
    let e1 = scene.create_empty_entity();
    scene
        .add_component(e1, Label { text: "left".into() })
        .unwrap();
    let e2 = scene.clone_entity(e1).unwrap();
    scene
        .get_component_mut::<Label>(e2)
        .unwrap()
        .unwrap()
        .text
        .push_str("-copy");

    assert_eq!(scene.try_get_component::<Label>(e1).unwrap().text, "left");
    assert_eq!(scene.try_get_component::<Label>(e2).unwrap().text, "left-copy");
}

#[test]
fn test_row_swap_safety() {
    let mut scene = Scene::new();
    let ids: Vec<EntityId> = (0..3)
        .map(|i| {
            let e = scene.create_empty_entity();
            scene.add_component(e, Health { current: i }).unwrap();
            scene
                .add_component(e, Label { text: format!("e{i}") })
                .unwrap();
            e
        })
        .collect();

    scene.destroy_entity(ids[1]).unwrap();

    for (i, &e) in ids.iter().enumerate() {
        if i == 1 {
            assert!(!scene.is_alive(e));
            continue;
        }
        assert_eq!(
            scene.try_get_component::<Health>(e),
            Some(&Health { current: i as i32 })
        );
        assert_eq!(scene.try_get_component::<Label>(e).unwrap().text, format!("e{i}"));
    }
    assert!(scene.is_consistent());
}

#[test]
fn test_migration_swaps_are_patched() {
    let mut scene = Scene::new();
    let ids: Vec<EntityId> = (0..5)
        .map(|i| {
            let e = scene.create_empty_entity();
            scene.add_component(e, Health { current: i }).unwrap();
            e
        })
        .collect();

    // Moving the first row out of the shared archetype pulls the last row
    // into its slot.
    scene.add_component(ids[0], position(0.0, 0.0)).unwrap();
    scene.remove_component::<Health>(ids[2]).unwrap();

    for (i, &e) in ids.iter().enumerate() {
        let expected = (i != 2).then_some(Health { current: i as i32 });
        assert_eq!(scene.try_get_component::<Health>(e).copied(), expected);
    }
    assert!(scene.is_consistent());
}

#[test]
fn test_density_after_mixed_operations() {
    let mut scene = Scene::new();
    let mut live = Vec::new();
    for i in 0..40_i32 {
        let e = scene.create_entity(None);
        if i % 2 == 0 {
            scene.add_component(e, Health { current: i }).unwrap();
        }
        if i % 3 == 0 {
            scene.add_component(e, position(i as f32, 0.0)).unwrap();
        }
        live.push(e);
    }
    for (i, e) in live.clone().into_iter().enumerate() {
        match i % 5 {
            0 => scene.destroy_entity(e).unwrap(),
            1 => {
                scene.remove_component::<Health>(e).unwrap();
            }
            2 => {
                scene.clone_entity(e).unwrap();
            }
            3 => {
                scene.add_component(e, Label::default()).unwrap();
            }
            _ => {}
        }
        assert!(scene.is_consistent(), "inconsistent after step {i}");
    }
    for table in scene.archetypes() {
        assert!(table.is_dense());
    }
}

#[test]
fn test_query_correctness_against_brute_force() {
    for invalidation in [QueryInvalidation::ArchetypeEpoch, QueryInvalidation::ClearAll] {
        let mut scene = Scene::with_config(SceneConfig::new().with_invalidation(invalidation));
        let mut entities = Vec::new();
        for i in 0..24_i32 {
            let e = scene.create_empty_entity();
            if i % 2 == 0 {
                scene.add_component(e, Health { current: i }).unwrap();
            }
            if i % 3 == 0 {
                scene.add_component(e, position(0.0, 0.0)).unwrap();
            }
            entities.push(e);
        }

        for round in 0..6 {
            let q_health = scene.cached_query::<(Health,)>();
            let q_both = scene.cached_query::<(Health, Position)>();

            let expected_health: HashSet<_> = entities
                .iter()
                .copied()
                .filter(|&e| scene.has_component::<Health>(e))
                .collect();
            let expected_both: HashSet<_> = expected_health
                .iter()
                .copied()
                .filter(|&e| scene.has_component::<Position>(e))
                .collect();
            assert_eq!(q_health.iter().collect::<HashSet<_>>(), expected_health);
            assert_eq!(q_both.iter().collect::<HashSet<_>>(), expected_both);

            // Mutate a different slice of entities each round.
            let e = entities[round * 3];
            if scene.has_component::<Health>(e) {
                scene.remove_component::<Health>(e).unwrap();
            } else {
                scene.add_component(e, Health { current: -1 }).unwrap();
            }
            let gone = entities.remove(round * 3 + 1);
            scene.destroy_entity(gone).unwrap();
        }
    }
}

#[test]
fn test_noops_do_not_move_rows() {
    let mut scene = Scene::new();
    let e = scene.create_empty_entity();
    scene.add_component(e, Health { current: 3 }).unwrap();
    let record = scene.entity_record(e);
    let cached = scene.cached_query::<(Health,)>();

    assert!(!scene.add_component(e, Health { current: 99 }).unwrap());
    assert_eq!(scene.remove_component::<Label>(e).unwrap(), None);
    assert_eq!(scene.entity_record(e), record);
    assert_eq!(scene.try_get_component::<Health>(e), Some(&Health { current: 3 }));
    assert!(!scene.is_stale(&cached));
}

#[test]
fn test_empty_archetypes_are_kept_for_reuse() {
    let mut scene = Scene::new();
    let e = scene.create_empty_entity();
    scene.add_component(e, Health::default()).unwrap();
    let archetype = scene.entity_record(e).unwrap().archetype;
    scene.destroy_entity(e).unwrap();
    assert!(scene.archetype(archetype).is_some_and(|table| table.is_empty()));

    let count = scene.archetypes().len();
    let again = scene.create_empty_entity();
    scene.add_component(again, Health::default()).unwrap();
    assert_eq!(scene.entity_record(again).unwrap().archetype, archetype);
    assert_eq!(scene.archetypes().len(), count);
}

#[test]
fn test_stale_handles_report_not_found() {
    let mut scene = Scene::new();
    let e = scene.create_empty_entity();
    scene.destroy_entity(e).unwrap();
    let replacement = scene.create_empty_entity();

    assert!(matches!(
        scene.add_component(e, Health::default()),
        Err(EcsError::EntityNotFound(_))
    ));
    assert!(matches!(
        scene.component_data(e, Health::component_id()),
        Err(EcsError::EntityNotFound(_))
    ));
    assert!(!scene.has_component::<Health>(replacement));
    assert!(scene.is_consistent());
}
