#![cfg(feature = "loaders")]

use std::fs;
use std::path::Path;

use modifiers_content::{ContentFactory, load_template_registry};
use modifiers_core::{
    AuraKind, ClassList, EngineConfig, Env, EntityId, ModifiersManager, PlayerId, WorldTable,
};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn loads_a_content_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("config.toml"), "template_precision = 2\n");
    write(
        &dir.path().join("templates/technologies/phase_town.ron"),
        r#"(affects: ["Structure"], modifications: [(value: "Health/Max", operation: multiply(1.5))])"#,
    );
    write(
        &dir.path().join("templates/technologies/armor_infantry_01.ron"),
        r#"(affects: ["Infantry"], modifications: [(value: "Resistance/Hack", operation: add(1.0))])"#,
    );
    write(
        &dir.path().join("templates/auras/heal.ron"),
        r#"(type: range, radius: Some(12.0), modifications: [(value: "Health/RegenRate", operation: add(1.0))])"#,
    );
    write(&dir.path().join("templates/auras/README.txt"), "not a template");

    let factory = ContentFactory::new(dir.path());
    let config = factory.load_config().unwrap();
    assert_eq!(config.template_precision, 2);

    let registry = factory.load_templates().unwrap();
    assert_eq!(
        registry.technology_names().collect::<Vec<_>>(),
        vec!["armor_infantry_01", "phase_town"]
    );
    assert_eq!(registry.aura_names().collect::<Vec<_>>(), vec!["heal"]);
    assert_eq!(registry.aura("heal").unwrap().kind, AuraKind::Range);
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let factory = ContentFactory::new(dir.path());
    assert_eq!(factory.load_config().unwrap(), EngineConfig::default());
    assert!(factory.load_templates().unwrap().is_empty());
}

#[test]
fn a_broken_template_names_its_file() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("technologies/broken.ron"), "(affects: [");

    let err = load_template_registry(dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("broken.ron"));
}

#[test]
fn loaded_technologies_drive_the_manager() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("technologies/hoplite_tradition.ron"),
        r#"(
            affects: ["Infantry Melee"],
            modifications: [
                (value: "Health/Max", operation: add(20.0)),
                (value: "Health/Max", operation: multiply(1.5), affects: Some("Citizen")),
            ],
        )"#,
    );
    let registry = load_template_registry(dir.path()).unwrap();
    let derived = registry.technology_modifications("hoplite_tradition").unwrap();

    let player = PlayerId(1);
    let player_scope = EntityId(2);
    let mut world = WorldTable::new();
    world.insert(EntityId(10), ClassList::parse("Unit Infantry Melee Citizen"), Some(player));
    world.insert(EntityId(11), ClassList::parse("Unit Infantry Melee"), Some(player));
    world.insert(EntityId(12), ClassList::parse("Unit Infantry Ranged"), Some(player));
    let env = Env::with_all(&world, &world);

    let mut manager = ModifiersManager::new(EngineConfig::default());
    manager.on_player_entity_changed(player, EntityId::INVALID, player_scope);
    assert_eq!(manager.add_modifiers("tech/hoplite_tradition", derived.iter(), player_scope, false), 1);

    assert_eq!(manager.apply_modifiers("Health/Max", 100.0, EntityId(10), &env), 170.0);
    assert_eq!(manager.apply_modifiers("Health/Max", 100.0, EntityId(11), &env), 120.0);
    assert_eq!(manager.apply_modifiers("Health/Max", 100.0, EntityId(12), &env), 100.0);
}
