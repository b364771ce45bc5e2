use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use modifiers_core::{
    ClassList, ComponentId, Directive, EngineConfig, EngineError, Env, EntityId, ErrorSeverity,
    ModifiersManager, NotificationRouter, NotifyError, PlayerId, PropertyPath, TemplateListener,
    TemplateModification, ValueListener, ValueModification, WorldTable,
};

const TEST_ENTITY: EntityId = EntityId(30);
const P2: PlayerId = PlayerId(2);
const P3: PlayerId = PlayerId(3);
const P2_SCOPE: EntityId = EntityId(20);
const P3_SCOPE: EntityId = EntityId(21);

/// A consumer that caches one resolved value and refreshes on notice.
struct CachedValue {
    world: Rc<RefCell<WorldTable>>,
    property: &'static str,
    base: f64,
    cached: Rc<Cell<f64>>,
    calls: Rc<Cell<usize>>,
}

impl ValueListener for CachedValue {
    fn on_value_modification(&mut self, manager: &mut ModifiersManager, event: &ValueModification) {
        self.calls.set(self.calls.get() + 1);
        if !event.entities.contains(&TEST_ENTITY) {
            return;
        }
        let world = self.world.borrow();
        let env = Env::with_all(&*world, &*world);
        self.cached
            .set(manager.apply_modifiers(self.property, self.base, TEST_ENTITY, &env));
    }
}

fn cached(
    world: &Rc<RefCell<WorldTable>>,
    property: &'static str,
    base: f64,
) -> (Box<CachedValue>, Rc<Cell<f64>>, Rc<Cell<usize>>) {
    let value = Rc::new(Cell::new(base));
    let calls = Rc::new(Cell::new(0));
    let listener = Box::new(CachedValue {
        world: Rc::clone(world),
        property,
        base,
        cached: Rc::clone(&value),
        calls: Rc::clone(&calls),
    });
    (listener, value, calls)
}

#[derive(Default)]
struct TemplateLog(Rc<RefCell<Vec<TemplateModification>>>);

impl TemplateListener for TemplateLog {
    fn on_template_modification(&mut self, event: &TemplateModification) {
        self.0.borrow_mut().push(event.clone());
    }
}

fn world() -> Rc<RefCell<WorldTable>> {
    let mut world = WorldTable::new();
    world.insert(TEST_ENTITY, ClassList::parse("Unit"), Some(P2));
    Rc::new(RefCell::new(world))
}

fn manager() -> ModifiersManager {
    let mut manager = ModifiersManager::new(EngineConfig::default());
    manager.on_player_entity_changed(P2, EntityId::INVALID, P2_SCOPE);
    manager.on_player_entity_changed(P3, EntityId::INVALID, P3_SCOPE);
    manager
}

#[test]
fn consumers_refresh_after_owner_switch() {
    let world = world();
    let mut manager = manager();
    let mut router = NotificationRouter::new();
    let (hp, cached_hp, _) = cached(&world, "HP", 100.0);
    let (vision, cached_vision, _) = cached(&world, "Vision", 20.0);
    router.register("HP", hp);
    router.register("Vision", vision);

    manager.add_modifier("HP", "HP_mod", vec![Directive::add("Unit", 50.0)], P2_SCOPE, false);
    manager.add_modifier("Vision", "Vision_mod", vec![Directive::add("Unit", 10.0)], P3_SCOPE, false);
    {
        let world = world.borrow();
        router.dispatch(&mut manager, &Env::with_all(&*world, &*world)).unwrap();
    }
    assert_eq!(cached_hp.get(), 150.0);
    assert_eq!(cached_vision.get(), 20.0);

    world.borrow_mut().set_owner(TEST_ENTITY, Some(P3));
    {
        let world = world.borrow();
        let env = Env::with_all(&*world, &*world);
        manager.on_ownership_changed(TEST_ENTITY, P2, P3, &env);
        router.dispatch(&mut manager, &env).unwrap();
    }
    assert_eq!(cached_hp.get(), 100.0);
    assert_eq!(cached_vision.get(), 30.0);
}

#[test]
fn player_notices_reach_template_listeners_once_per_component() {
    let world = world();
    let mut manager = manager();
    let mut router = NotificationRouter::new();
    let (hp, _, calls) = cached(&world, "Health/Max", 100.0);
    router.register("Health", hp);
    let log = TemplateLog::default();
    let events = Rc::clone(&log.0);
    router.register_template_listener(Box::new(log));

    let batch: Vec<(PropertyPath, Arc<[Directive]>)> = vec![
        ("Health/Max".into(), vec![Directive::add("Unit", 1.0)].into()),
        ("Health/RegenRate".into(), vec![Directive::add("Unit", 1.0)].into()),
    ];
    manager.add_modifiers("tech", batch, P2_SCOPE, false);

    let world = world.borrow();
    let delivered = router
        .dispatch(&mut manager, &Env::with_all(&*world, &*world))
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(calls.get(), 1);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].player, P2);
    assert_eq!(events[0].component, ComponentId::from("Health"));
    assert_eq!(events[0].properties.len(), 2);
}

#[test]
fn player_notices_fall_back_to_tracked_entities_without_ownership() {
    let world = world();
    let mut manager = manager();
    let mut router = NotificationRouter::new();
    let (hp, cached_hp, _) = cached(&world, "HP", 100.0);
    router.register("HP", hp);

    manager.add_modifier("HP", "tech", vec![Directive::add("Unit", 1.0)], P2_SCOPE, false);
    {
        let world = world.borrow();
        let env = Env::with_all(&*world, &*world);
        assert_eq!(manager.apply_modifiers("HP", 100.0, TEST_ENTITY, &env), 101.0);
    }
    manager.take_notices();

    manager.add_modifier("HP", "tech", vec![Directive::add("Unit", 7.0)], P2_SCOPE, false);
    // No oracles: only entities that resolved through the player scope are told.
    let empty = Env::<WorldTable, WorldTable>::empty();
    router.dispatch(&mut manager, &empty).unwrap();
    assert_eq!(cached_hp.get(), 107.0);
}

#[test]
fn unregistered_component_is_fatal() {
    let mut manager = manager();
    let mut router = NotificationRouter::new();
    manager.add_modifier("Cost/Food", "tech", vec![Directive::multiply("Unit", 0.9)], TEST_ENTITY, false);

    let err = router
        .dispatch(&mut manager, &Env::<WorldTable, WorldTable>::empty())
        .unwrap_err();
    assert!(matches!(err, NotifyError::UnknownComponent { .. }));
    assert_eq!(err.severity(), ErrorSeverity::Fatal);
}

/// Re-registers its own modifier on every notice, so dispatch never settles.
struct Feedback;

impl ValueListener for Feedback {
    fn on_value_modification(&mut self, manager: &mut ModifiersManager, event: &ValueModification) {
        for entity in &event.entities {
            manager.add_modifier("Loop/Value", "loop", vec![Directive::add("Unit", 1.0)], *entity, false);
        }
    }
}

#[test]
fn runaway_listeners_hit_the_round_limit() {
    let mut manager = ModifiersManager::new(EngineConfig::default().with_max_dispatch_rounds(4));
    let mut router = NotificationRouter::new();
    router.register("Loop", Box::new(Feedback));
    manager.add_modifier("Loop/Value", "loop", vec![Directive::add("Unit", 1.0)], TEST_ENTITY, false);

    let err = router
        .dispatch(&mut manager, &Env::<WorldTable, WorldTable>::empty())
        .unwrap_err();
    assert_eq!(err, NotifyError::DispatchLimit { rounds: 4 });
    assert_eq!(err.severity(), ErrorSeverity::Internal);
}
