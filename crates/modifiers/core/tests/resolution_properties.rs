use modifiers_core::{
    ClassList, Directive, EngineConfig, Env, EntityId, ModifiersManager, Notice, PlayerId,
    StoreSnapshot, WorldTable,
};

const OLD_OWNER: PlayerId = PlayerId(1);
const NEW_OWNER: PlayerId = PlayerId(2);
const OLD_SCOPE: EntityId = EntityId(101);
const NEW_SCOPE: EntityId = EntityId(102);
const HP: &str = "Health/Max";
const VISION: &str = "Vision/Range";

fn setup() -> (WorldTable, ModifiersManager) {
    let mut world = WorldTable::new();
    world.insert(EntityId(10), ClassList::parse("Unit Infantry"), Some(OLD_OWNER));
    world.insert(EntityId(11), ClassList::parse("Unit Infantry"), Some(OLD_OWNER));
    world.insert(EntityId(12), ClassList::parse("Structure"), Some(OLD_OWNER));

    let mut manager = ModifiersManager::new(EngineConfig::default());
    manager.on_player_entity_changed(OLD_OWNER, EntityId::INVALID, OLD_SCOPE);
    manager.on_player_entity_changed(NEW_OWNER, EntityId::INVALID, NEW_SCOPE);
    (world, manager)
}

#[test]
fn composition_is_independent_of_cross_scope_registration_order() {
    let (world, mut first) = setup();
    let (_, mut second) = setup();
    let env = Env::with_all(&world, &world);

    first.add_modifier(HP, "tech", vec![Directive::add("Unit", 7.0)], OLD_SCOPE, false);
    first.add_modifier(HP, "aura", vec![Directive::add("Unit", 3.0)], EntityId(10), false);

    second.add_modifier(HP, "aura", vec![Directive::add("Unit", 3.0)], EntityId(10), false);
    second.add_modifier(HP, "tech", vec![Directive::add("Unit", 7.0)], OLD_SCOPE, false);

    assert_eq!(first.apply_modifiers(HP, 100.0, EntityId(10), &env), 110.0);
    assert_eq!(second.apply_modifiers(HP, 100.0, EntityId(10), &env), 110.0);
}

#[test]
fn non_stackable_re_registration_does_not_double_count() {
    let (world, mut manager) = setup();
    let env = Env::with_all(&world, &world);

    for _ in 0..3 {
        manager.add_modifier(HP, "aura", vec![Directive::add("Unit", 5.0)], EntityId(10), false);
    }
    assert!(manager.has_modifier(HP, "aura", EntityId(10)));
    assert_eq!(manager.get_modifiers(HP, EntityId(10), false).len(), 1);
    assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(10), &env), 105.0);
}

#[test]
fn stackable_instances_fold_once_each() {
    let (world, mut manager) = setup();
    let env = Env::with_all(&world, &world);

    manager.add_modifier(HP, "heal", vec![Directive::add("Unit", 5.0)], EntityId(10), true);
    manager.add_modifier(HP, "heal", vec![Directive::add("Unit", 5.0)], EntityId(10), true);
    assert_eq!(manager.get_modifiers(HP, EntityId(10), true).len(), 2);
    assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(10), &env), 110.0);

    manager.remove_modifier(HP, "heal", EntityId(10), true);
    assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(10), &env), 105.0);
}

#[test]
fn removing_a_player_source_invalidates_every_dependant() {
    let (world, mut manager) = setup();
    let env = Env::with_all(&world, &world);

    manager.add_modifier(HP, "tech", vec![Directive::multiply("Unit", 2.0)], OLD_SCOPE, false);
    manager.add_modifier(VISION, "tech", vec![Directive::add("Unit", 4.0)], OLD_SCOPE, false);
    assert_eq!(manager.apply_modifiers(HP, 50.0, EntityId(10), &env), 100.0);
    assert_eq!(manager.apply_modifiers(HP, 50.0, EntityId(11), &env), 100.0);
    assert_eq!(manager.apply_modifiers(VISION, 20.0, EntityId(11), &env), 24.0);

    assert_eq!(manager.remove_all_modifiers("tech", OLD_SCOPE, false), 2);
    assert_eq!(manager.remove_all_modifiers("tech", OLD_SCOPE, false), 0);

    assert_eq!(manager.apply_modifiers(HP, 50.0, EntityId(10), &env), 50.0);
    assert_eq!(manager.apply_modifiers(HP, 50.0, EntityId(11), &env), 50.0);
    assert_eq!(manager.apply_modifiers(VISION, 20.0, EntityId(11), &env), 20.0);
}

#[test]
fn ownership_transfer_swaps_exactly_the_player_effects() {
    let (mut world, mut manager) = setup();
    let entity = EntityId(10);

    manager.add_modifier(HP, "old/hp", vec![Directive::add("Unit", 50.0)], OLD_SCOPE, false);
    manager.add_modifier(VISION, "new/vision", vec![Directive::add("Unit", 10.0)], NEW_SCOPE, false);
    manager.add_modifier(HP, "local", vec![Directive::add("Unit", 5.0)], entity, false);
    manager.add_modifier(VISION, "local", vec![Directive::add("Unit", 5.0)], entity, false);

    {
        let env = Env::with_all(&world, &world);
        assert_eq!(manager.apply_modifiers(HP, 100.0, entity, &env), 155.0);
        assert_eq!(manager.apply_modifiers(VISION, 20.0, entity, &env), 25.0);
    }
    manager.take_notices();

    world.set_owner(entity, Some(NEW_OWNER));
    let env = Env::with_all(&world, &world);
    manager.on_ownership_changed(entity, OLD_OWNER, NEW_OWNER, &env);

    assert_eq!(manager.apply_modifiers(HP, 100.0, entity, &env), 105.0);
    assert_eq!(manager.apply_modifiers(VISION, 20.0, entity, &env), 35.0);

    let notices = manager.take_notices();
    assert_eq!(notices.len(), 2);
    for notice in &notices {
        let Notice::Ownership { entity: target, properties, .. } = notice else {
            panic!("unexpected notice {notice:?}");
        };
        assert_eq!(*target, entity);
        assert_eq!(properties.len(), 1);
    }
}

#[test]
fn ownership_transfer_between_equal_bonuses_is_silent() {
    let (mut world, mut manager) = setup();
    let entity = EntityId(10);
    manager.add_modifier(HP, "old", vec![Directive::add("Unit", 5.0)], OLD_SCOPE, false);
    manager.add_modifier(HP, "new", vec![Directive::add("Infantry", 5.0)], NEW_SCOPE, false);
    // Does not apply to infantry on either side.
    manager.add_modifier(VISION, "old", vec![Directive::add("Structure", 5.0)], OLD_SCOPE, false);
    manager.take_notices();

    world.set_owner(entity, Some(NEW_OWNER));
    let env = Env::with_all(&world, &world);
    manager.on_ownership_changed(entity, OLD_OWNER, NEW_OWNER, &env);
    assert!(manager.take_notices().is_empty());
}

#[cfg(feature = "serde")]
#[test]
fn restore_resolves_identically() {
    let (world, mut manager) = setup();
    let env = Env::with_all(&world, &world);

    manager.add_modifier(HP, "tech", vec![Directive::multiply("Unit", 1.5)], OLD_SCOPE, false);
    manager.add_modifier(HP, "local", vec![Directive::add("Infantry", 2.0)], EntityId(10), false);
    manager.add_modifier(HP, "aura/heal1", vec![Directive::add("Unit", 1.0)], EntityId(10), true);
    manager.add_modifier(HP, "aura/heal2", vec![Directive::add("Unit", 1.0)], EntityId(10), true);
    manager.add_modifier(HP, "aura/heal2", vec![Directive::add("Unit", 1.0)], EntityId(10), true);

    let before: Vec<f64> = [EntityId(10), EntityId(11), EntityId(12)]
        .into_iter()
        .map(|entity| manager.apply_modifiers(HP, 40.0, entity, &env))
        .collect();
    assert_eq!(before, vec![65.0, 60.0, 40.0]);

    let snapshot = manager.snapshot();
    let bytes = snapshot.to_bytes().unwrap();
    let mut restored =
        ModifiersManager::restore(EngineConfig::default(), StoreSnapshot::from_bytes(&bytes).unwrap()).unwrap();

    let after: Vec<f64> = [EntityId(10), EntityId(11), EntityId(12)]
        .into_iter()
        .map(|entity| restored.apply_modifiers(HP, 40.0, entity, &env))
        .collect();
    assert_eq!(before, after);
    assert_eq!(restored.snapshot().state_hash().unwrap(), snapshot.state_hash().unwrap());
}

#[test]
fn class_filter_excludes_non_matching_targets() {
    let (world, mut manager) = setup();
    let env = Env::with_all(&world, &world);

    manager.add_modifier(HP, "walls", vec![Directive::multiply("Structure", 3.0)], OLD_SCOPE, false);
    manager.add_modifier(HP, "heroes", vec![Directive::replace("Unit+Hero", 1.0)], EntityId(10), false);

    assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(10), &env), 100.0);
    assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(12), &env), 300.0);
}

#[test]
fn template_queries_ignore_local_modifiers_and_leave_the_cache_alone() {
    let (world, mut manager) = setup();
    let env = Env::with_all(&world, &world);
    let infantry = ClassList::parse("Unit Infantry");

    manager.add_modifier(HP, "tech", vec![Directive::add("Unit", 10.0)], OLD_SCOPE, false);
    manager.add_modifier(HP, "local", vec![Directive::add("Unit", 1000.0)], EntityId(10), false);

    assert_eq!(manager.apply_template_modifiers(HP, 100.0, Some(&infantry), OLD_OWNER), 110.0);
    assert_eq!(manager.apply_template_modifiers(HP, 100.0, Some(&infantry), NEW_OWNER), 100.0);

    assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(10), &env), 1110.0);
    assert_eq!(manager.apply_modifiers(HP, 100.0, EntityId(11), &env), 110.0);
}

#[test]
fn last_registered_replace_wins_within_a_scope() {
    let (world, mut manager) = setup();
    let env = Env::with_all(&world, &world);

    manager.add_modifier(HP, "first", vec![Directive::replace("Unit", 10.0)], EntityId(10), false);
    manager.add_modifier(HP, "second", vec![Directive::replace("Unit", 20.0)], EntityId(10), false);
    assert_eq!(manager.apply_modifiers(HP, 1.0, EntityId(10), &env), 20.0);

    // Re-registering keeps the entry's position, so "second" still wins.
    manager.add_modifier(HP, "first", vec![Directive::replace("Unit", 30.0)], EntityId(10), false);
    assert_eq!(manager.apply_modifiers(HP, 1.0, EntityId(10), &env), 20.0);
}

#[test]
fn destroyed_entities_drop_their_modifiers() {
    let (world, mut manager) = setup();
    let env = Env::with_all(&world, &world);

    manager.add_modifier(HP, "aura", vec![Directive::add("Unit", 5.0)], EntityId(10), false);
    assert_eq!(manager.apply_modifiers(HP, 1.0, EntityId(10), &env), 6.0);

    manager.on_entity_destroyed(EntityId(10));
    assert!(manager.is_destroyed(EntityId(10)));
    assert!(!manager.add_modifier(HP, "aura", vec![Directive::add("Unit", 5.0)], EntityId(10), false));
    assert!(manager.snapshot().entries.is_empty());

    manager.finish_step();
    assert!(!manager.is_destroyed(EntityId(10)));
}
