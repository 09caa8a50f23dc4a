use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use engine::{
    run_headless, EntityId, Host, InputCollector, InputFeed, InputSnapshot, Key, LoopConfig,
    Pacing, Scene, SceneWorld, StopReason, Tag, Vec2,
};
use serde_json::json;
use tempfile::TempDir;

use super::binding::EntityBinding;
use super::config::BehaviorConfig;
use super::reload::ConfigReloader;
use super::scene::GameplayScene;

const DT: f32 = 1.0 / 60.0;

fn begin_tick(world: &mut SceneWorld, keys: &[Key]) {
    let mut snapshot = InputSnapshot::empty();
    for key in keys {
        snapshot = snapshot.with_key_down(*key, true);
    }
    world.begin_tick(DT, snapshot);
}

fn overlay_count(world: &SceneWorld) -> usize {
    world.entities_with_tag(Tag::Overlay).count()
}

fn spawned_binding(config: BehaviorConfig) -> (EntityBinding, SceneWorld, EntityId) {
    let mut binding = EntityBinding::new(config);
    let mut world = SceneWorld::default();
    let player = binding.spawn_player(&mut world).expect("player");
    world.apply_pending();
    (binding, world, player)
}

fn assert_vec2_close(actual: Vec2, expected: Vec2) {
    assert!(
        (actual.x - expected.x).abs() < 1e-3 && (actual.y - expected.y).abs() < 1e-3,
        "expected {expected:?}, got {actual:?}"
    );
}

#[test]
fn diagonal_input_moves_player_at_axis_speed() {
    let (mut binding, mut world, player) = spawned_binding(BehaviorConfig::default());

    begin_tick(&mut world, &[Key::W, Key::D]);
    binding.update_player(&mut world, player);

    let moved = world.get_position(player).expect("position");
    assert!((moved.length() - 200.0 * DT).abs() < 1e-4);
    assert!((moved.x - moved.y).abs() < 1e-6);
}

#[test]
fn arrow_keys_and_letters_are_interchangeable() {
    let (mut binding, mut world, player) = spawned_binding(BehaviorConfig::default());

    begin_tick(&mut world, &[Key::Left]);
    binding.update_player(&mut world, player);
    let by_arrow = world.get_position(player).expect("position");

    world.set_position(player, Vec2::ZERO).expect("reset");
    begin_tick(&mut world, &[Key::A]);
    binding.update_player(&mut world, player);
    let by_letter = world.get_position(player).expect("position");

    assert_eq!(by_arrow, by_letter);
    assert_vec2_close(by_arrow, Vec2::new(-200.0 * DT, 0.0));
}

#[test]
fn unknown_entity_updates_are_silent_no_ops() {
    let mut binding = EntityBinding::new(BehaviorConfig::default());
    let mut world = SceneWorld::default();
    let ghost = EntityId(999);
    begin_tick(&mut world, &[Key::D]);

    binding.update_player(&mut world, ghost);
    binding.update_camera(&mut world, ghost);
    binding.update_healthbar(&mut world, ghost);
    binding.despawn_player(&mut world, ghost);
    world.apply_pending();

    assert_eq!(world.entity_count(), 0);
    assert_eq!(world.camera_position(), Vec2::ZERO);
}

#[test]
fn health_bar_calls_for_unknown_ids_leave_no_cache_entries() {
    let mut binding = EntityBinding::new(BehaviorConfig::default());
    let mut world = SceneWorld::default();

    for raw in 1000..1064 {
        binding.update_healthbar(&mut world, EntityId(raw));
    }
    assert!(binding.roles().health_bars.is_empty());
}

#[test]
fn health_bar_of_externally_despawned_entity_is_cleaned_up() {
    let (mut binding, mut world, player) = spawned_binding(BehaviorConfig::default());
    binding.update_healthbar(&mut world, player);
    world.apply_pending();
    assert_eq!(overlay_count(&world), 2);

    world.despawn_entity(player).expect("external despawn");
    world.apply_pending();
    binding.update_healthbar(&mut world, player);
    world.apply_pending();

    assert_eq!(overlay_count(&world), 0);
    assert_eq!(world.entity_count(), 0);
    assert!(binding.roles().health_bars.is_empty());
}

#[test]
fn health_bar_tracks_half_health_at_half_width() {
    let (mut binding, mut world, player) = spawned_binding(BehaviorConfig::default());
    world.set_health(player, 50.0).expect("damage");

    binding.update_healthbar(&mut world, player);
    world.apply_pending();

    let widths: Vec<f32> = world
        .entities_with_tag(Tag::Overlay)
        .map(|entity| entity.sprite.width)
        .collect();
    assert_eq!(widths.len(), 2);
    assert!(widths.contains(&50.0));
    assert!(widths.contains(&25.0));
}

#[test]
fn camera_converges_on_player_without_overshoot() {
    let (mut binding, mut world, player) = spawned_binding(BehaviorConfig::default());
    world.set_position(player, Vec2::new(400.0, -300.0)).expect("move");

    let mut last = f32::MAX;
    for _ in 0..180 {
        begin_tick(&mut world, &[]);
        binding.update_camera(&mut world, player);
        let camera = world.camera_position();
        assert!(camera.x <= 400.0 + 1e-3 && camera.y >= -300.0 - 1e-3);
        let distance = camera.distance(Vec2::new(400.0, -300.0));
        assert!(distance <= last);
        last = distance;
    }
    assert!(last < 0.1);
}

#[test]
fn world_spawn_twice_leaves_one_set() {
    let mut binding = EntityBinding::new(BehaviorConfig::default());
    let mut world = SceneWorld::default();

    let first: Vec<EntityId> = binding.spawn_world(&mut world).to_vec();
    world.apply_pending();
    let second: Vec<EntityId> = binding.spawn_world(&mut world).to_vec();
    world.apply_pending();

    assert_eq!(first.len(), 100);
    assert_eq!(second.len(), 100);
    assert!(first.iter().all(|id| !second.contains(id)));
    assert_eq!(world.entity_count(), 100);
    assert_eq!(binding.world_elements(), second.as_slice());
    let markers_at_origin = world
        .entities_with_tag(Tag::WorldElement)
        .skip(1)
        .filter(|entity| entity.transform.position == Vec2::ZERO)
        .count();
    assert_eq!(markers_at_origin, 0);
}

#[test]
fn despawn_world_clears_elements() {
    let mut binding = EntityBinding::new(BehaviorConfig::default());
    let mut world = SceneWorld::default();
    binding.spawn_world(&mut world);
    world.apply_pending();

    binding.despawn_world(&mut world);
    world.apply_pending();
    assert!(binding.world_elements().is_empty());
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn reload_keeps_role_store_and_never_duplicates_overlays() {
    let (mut binding, mut world, player) = spawned_binding(BehaviorConfig::default());
    binding.update_healthbar(&mut world, player);
    world.apply_pending();
    assert_eq!(overlay_count(&world), 2);

    let mut faster = BehaviorConfig::default();
    faster.player.speed = 600.0;
    faster.health_bar.width = 80.0;
    let outcome = binding.reload(faster);
    assert!(!outcome.world_changed);

    begin_tick(&mut world, &[Key::D]);
    binding.update_player(&mut world, player);
    binding.update_healthbar(&mut world, player);
    world.apply_pending();

    assert_eq!(binding.player(), Some(player));
    assert_eq!(overlay_count(&world), 2);
    assert_vec2_close(
        world.get_position(player).expect("position"),
        Vec2::new(600.0 * DT, 0.0),
    );
    let widest = world
        .entities_with_tag(Tag::Overlay)
        .map(|entity| entity.sprite.width)
        .fold(0.0f32, f32::max);
    assert_eq!(widest, 80.0);
}

#[test]
fn despawn_player_removes_overlays() {
    let (mut binding, mut world, player) = spawned_binding(BehaviorConfig::default());
    binding.update_healthbar(&mut world, player);
    world.apply_pending();

    binding.despawn_player(&mut world, player);
    world.apply_pending();

    assert_eq!(world.entity_count(), 0);
    assert!(binding.player().is_none());
    assert!(binding.roles().health_bars.is_empty());
}

#[test]
fn stamina_disabled_keeps_full_speed() {
    let (mut binding, mut world, player) = spawned_binding(BehaviorConfig::default());
    for _ in 0..600 {
        begin_tick(&mut world, &[Key::D]);
        binding.update_player(&mut world, player);
    }
    let position = world.get_position(player).expect("position");
    assert!((position.x - 2000.0).abs() < 0.5);
}

#[test]
fn stamina_enabled_slows_sustained_movement() {
    let mut config = BehaviorConfig::default();
    config.player.stamina.enabled = true;
    let (mut binding, mut world, player) = spawned_binding(config);

    let mut last_step = f32::MAX;
    let mut previous_x = 0.0;
    for _ in 0..(60 * 6) {
        begin_tick(&mut world, &[Key::D]);
        binding.update_player(&mut world, player);
        let x = world.get_position(player).expect("position").x;
        let step = x - previous_x;
        assert!(step <= last_step + 1e-3);
        last_step = step;
        previous_x = x;
    }
    assert!((last_step - 200.0 * 0.2 * DT).abs() < 1e-3);

    let stamina = binding.roles().stamina.get(&player).expect("stamina");
    assert_eq!(stamina.current, 0.0);
}

#[test]
fn agent_orbits_player_when_enabled() {
    let mut config = BehaviorConfig::default();
    config.agent.enabled = true;
    let (mut binding, mut world, player) = spawned_binding(config);

    let agent = binding.spawn_agent(&mut world, player).expect("agent");
    world.apply_pending();
    assert_eq!(world.get_position(agent), Ok(Vec2::new(150.0, 0.0)));

    for _ in 0..30 {
        begin_tick(&mut world, &[]);
        binding.update_agents(&mut world, player);
    }
    let position = world.get_position(agent).expect("agent position");
    assert!((position.length() - 150.0).abs() < 1e-2);
    assert!(position.y > 0.0);
    assert!(world.find_entity(agent).expect("agent").has_tag(Tag::Agent));
}

#[test]
fn lost_agent_is_dropped_from_role_store() {
    let (mut binding, mut world, player) = spawned_binding(BehaviorConfig::default());
    let agent = binding.spawn_agent(&mut world, player).expect("agent");
    world.apply_pending();
    world.despawn_entity(agent).expect("external despawn");
    world.apply_pending();

    begin_tick(&mut world, &[]);
    binding.update_agents(&mut world, player);
    assert!(!binding.has_agents());
}

#[test]
fn scene_load_spawns_world_player_and_bar_after_first_tick() {
    let mut scene = GameplayScene::new(BehaviorConfig::default(), None);
    let mut world = SceneWorld::default();
    scene.load(&mut world);
    world.apply_pending();
    assert_eq!(world.entity_count(), 101);

    begin_tick(&mut world, &[]);
    let input = *world.input();
    scene.update(DT, &input, &mut world);
    world.apply_pending();
    assert_eq!(world.entity_count(), 103);
    assert_eq!(world.entities_with_tag(Tag::CameraTarget).count(), 1);

    scene.unload(&mut world);
    world.apply_pending();
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn scene_hot_reload_respawns_world_and_keeps_overlays() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("behavior.json");
    let initial = BehaviorConfig::default().to_pretty_json().expect("json");
    fs::write(&path, &initial).expect("write");

    let reloader = ConfigReloader::new(&path, 1, Some(&initial)).expect("reloader");
    let mut scene = GameplayScene::new(BehaviorConfig::default(), Some(reloader));
    let mut world = SceneWorld::default();
    scene.load(&mut world);
    world.apply_pending();

    let tick = |scene: &mut GameplayScene, world: &mut SceneWorld| {
        world.begin_tick(DT, InputSnapshot::empty());
        let input = *world.input();
        scene.update(DT, &input, world);
        world.apply_pending();
    };
    tick(&mut scene, &mut world);
    assert_eq!(overlay_count(&world), 2);

    fs::write(
        &path,
        json!({ "world": { "ground_size": 400.0, "grid_spacing": 200.0 } }).to_string(),
    )
    .expect("edit");
    let deadline = Instant::now() + Duration::from_secs(5);
    while scene.binding().config().world.ground_size != 400.0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
        tick(&mut scene, &mut world);
    }

    assert_eq!(scene.binding().config().world.ground_size, 400.0);
    assert_eq!(scene.binding().world_elements().len(), 4);
    assert_eq!(overlay_count(&world), 2);
    assert_eq!(world.entity_count(), 4 + 1 + 2);

    fs::write(&path, "{ \"world\": { \"grid_spacing\": 0 } }").expect("bad edit");
    for _ in 0..15 {
        thread::sleep(Duration::from_millis(20));
        tick(&mut scene, &mut world);
    }
    assert_eq!(scene.binding().config().world.grid_spacing, 200.0);
    assert_eq!(world.entity_count(), 4 + 1 + 2);
}

struct HoldKeys {
    keys: Vec<Key>,
    release_at: u64,
}

impl InputFeed for HoldKeys {
    fn feed(&mut self, tick: u64, input: &mut InputCollector) {
        if tick == 0 {
            for key in &self.keys {
                input.handle_key(*key, true);
            }
        }
        if tick == self.release_at {
            input.release_all();
        }
    }
}

#[test]
fn headless_run_moves_player_and_camera_follows() {
    let config = LoopConfig {
        pacing: Pacing::Unpaced,
        max_ticks: Some(120),
        ..LoopConfig::default()
    };
    let mut feed = HoldKeys {
        keys: vec![Key::Right],
        release_at: 60,
    };
    let scene = GameplayScene::new(BehaviorConfig::default(), None);

    let summary = run_headless(&config, Box::new(scene), &mut feed);

    assert_eq!(summary.stop_reason, StopReason::TickLimit);
    assert_eq!(summary.ticks_run, 120);
    assert_eq!(summary.final_entity_count, 103);
    let title = summary.final_title.expect("title");
    assert!(title.contains("player (200.0, 0.0)"), "{title}");
    assert!(summary.final_camera_position.x > 190.0);
    assert!(summary.final_camera_position.x <= 200.0);
}
