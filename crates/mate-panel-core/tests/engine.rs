use std::cell::RefCell;
use std::rc::Rc;

use mate_panel_core::{
    EngineSettings, GrabKey, InputModifiers, ManualClock, Monitor, MonitorRegistry, Orientation, PanelManager,
    PanelsConfig, Rect, RecordingBackend, SharedMonitorSource, ToplevelConfig, ToplevelEvent, ToplevelId,
    ToplevelState,
};

struct Harness {
    manager: PanelManager,
    backend: RecordingBackend,
    clock: ManualClock,
}

fn harness(monitors: Vec<Monitor>) -> Harness {
    let backend = RecordingBackend::new();
    let clock = ManualClock::new();
    let manager = PanelManager::new(
        MonitorRegistry::with_monitors(monitors),
        Box::new(backend.clone()),
        Box::new(clock.clone()),
        EngineSettings::default(),
    );
    Harness { manager, backend, clock }
}

fn single_monitor() -> Harness {
    harness(vec![Monitor::new(Rect::new(0, 0, 1920, 1080))])
}

fn side_by_side(count: i32) -> Vec<Monitor> {
    (0..count)
        .map(|i| Monitor::new(Rect::new(i * 1920, 0, 1920, 1080)))
        .collect()
}

fn shown(manager: &mut PanelManager, config: &ToplevelConfig) -> ToplevelId {
    let id = manager.create_toplevel(config);
    manager.process_timers();
    id
}

/// Step the clock one animation tick at a time until nothing animates
fn run_animations(h: &mut Harness) -> usize {
    for ticks in 0..500 {
        if !h.manager.toplevels().any(|t| t.is_animating()) {
            return ticks;
        }
        h.clock.advance_ms(20);
        h.manager.process_timers();
    }
    panic!("animation did not terminate");
}

#[test]
fn test_stacked_top_panels() {
    let mut h = single_monitor();
    let a = shown(&mut h.manager, &ToplevelConfig::new("a"));
    let b = shown(&mut h.manager, &ToplevelConfig::new("b"));
    h.manager.flush();

    assert_eq!(h.manager.toplevel(a).unwrap().geometry(), Rect::new(0, 0, 1920, 24));
    assert_eq!(h.manager.toplevel(b).unwrap().geometry(), Rect::new(0, 24, 1920, 24));

    // The second panel reserves both bands
    let strut = h.backend.last_placement(b).unwrap().strut.unwrap();
    assert_eq!(strut.orientation, Orientation::Top);
    assert_eq!(strut.size, 48);

    // Removing the first one lets the second move up
    h.manager.destroy(a);
    h.manager.flush();
    assert_eq!(h.manager.toplevel(b).unwrap().geometry(), Rect::new(0, 0, 1920, 24));
}

#[test]
fn test_auto_hide_follows_pointer_with_delays() {
    let mut h = single_monitor();
    let mut config = ToplevelConfig::new("top");
    config.auto_hide = true;
    let id = shown(&mut h.manager, &config);

    let t = h.manager.toplevel(id).unwrap();
    assert_eq!(t.state(), ToplevelState::AutoHidden);
    assert_eq!(t.geometry().height, t.effective_auto_hide_size());

    h.manager.pointer_enter(id);
    h.clock.advance_ms(99);
    h.manager.process_timers();
    assert_eq!(h.manager.toplevel(id).unwrap().state(), ToplevelState::AutoHidden);
    h.clock.advance_ms(1);
    h.manager.process_timers();
    assert_eq!(h.manager.toplevel(id).unwrap().state(), ToplevelState::Normal);
    assert_eq!(h.manager.toplevel(id).unwrap().geometry().height, 24);

    h.manager.pointer_leave(id);
    h.clock.advance_ms(299);
    h.manager.process_timers();
    assert_eq!(h.manager.toplevel(id).unwrap().state(), ToplevelState::Normal);
    h.clock.advance_ms(1);
    h.manager.process_timers();
    assert_eq!(h.manager.toplevel(id).unwrap().state(), ToplevelState::AutoHidden);

    // Only the sliver stays reserved
    let strut = h.backend.last_placement(id).unwrap().strut.unwrap();
    assert_eq!(strut.size, h.manager.toplevel(id).unwrap().effective_auto_hide_size() as u32);
}

#[test]
fn test_pointer_return_cancels_pending_hide() {
    let mut h = single_monitor();
    let mut config = ToplevelConfig::new("top");
    config.auto_hide = true;
    let id = shown(&mut h.manager, &config);

    h.manager.pointer_enter(id);
    h.clock.advance_ms(100);
    h.manager.process_timers();

    h.manager.pointer_leave(id);
    h.clock.advance_ms(200);
    h.manager.pointer_enter(id);
    h.clock.advance_ms(500);
    h.manager.process_timers();
    assert_eq!(h.manager.toplevel(id).unwrap().state(), ToplevelState::Normal);
}

#[test]
fn test_four_rotations_return_home() {
    let mut h = single_monitor();
    let id = shown(&mut h.manager, &ToplevelConfig::new("top"));
    let home = h.manager.toplevel(id).unwrap().geometry();

    let mut seen = Vec::new();
    for _ in 0..4 {
        assert!(h.manager.rotate(id, true));
        h.manager.flush();
        seen.push(h.manager.toplevel(id).unwrap().orientation());
    }

    assert_eq!(seen.last(), Some(&Orientation::Top));
    seen.sort_by_key(|o| *o as u8);
    seen.dedup();
    assert_eq!(seen.len(), 4);
    assert_eq!(h.manager.toplevel(id).unwrap().geometry(), home);
}

#[test]
fn test_missing_monitor_is_picked_up_after_hotplug() {
    let source = SharedMonitorSource::new(side_by_side(1));
    let backend = RecordingBackend::new();
    let mut manager = PanelManager::new(
        MonitorRegistry::new(vec![Box::new(source.clone())]),
        Box::new(backend.clone()),
        Box::new(ManualClock::new()),
        EngineSettings::default(),
    );

    let id = shown(&mut manager, &ToplevelConfig::new("top"));
    assert!(manager.set_monitor(id, 5));
    manager.flush();

    let t = manager.toplevel(id).unwrap();
    assert_eq!(t.configured_monitor(), 5);
    assert_eq!(t.monitor(), 0);
    assert_eq!(t.geometry(), Rect::new(0, 0, 1920, 24));

    source.set_monitors(side_by_side(6));
    manager.reinit_monitors();
    manager.flush();

    let t = manager.toplevel(id).unwrap();
    assert_eq!(manager.monitors().count(), 6);
    assert_eq!(t.monitor(), 5);
    assert_eq!(t.geometry(), Rect::new(9600, 0, 1920, 24));
    assert_eq!(backend.last_placement(id).unwrap().monitor, 5);
}

#[test]
fn test_hide_animation_terminates_at_static_geometry() {
    let mut h = single_monitor();
    let id = shown(&mut h.manager, &ToplevelConfig::new("top"));
    h.manager.realize(id);
    h.manager.flush();

    let unhiding = Rc::new(RefCell::new(0));
    let sink = unhiding.clone();
    h.manager.subscribe(move |_, event| {
        if event == ToplevelEvent::Unhiding {
            *sink.borrow_mut() += 1;
        }
    });

    h.manager.hide(id, false, None);
    assert!(h.manager.toplevel(id).unwrap().is_animating());
    let ticks = run_animations(&mut h);
    assert!(ticks <= 400 / 20 + 1);
    let animated = h.manager.toplevel(id).unwrap().geometry();

    // Same end geometry as an unrealized panel that jumps
    let mut still = single_monitor();
    let other = shown(&mut still.manager, &ToplevelConfig::new("top"));
    still.manager.hide(other, false, None);
    still.manager.flush();
    assert_eq!(animated, still.manager.toplevel(other).unwrap().geometry());
    assert!(animated.height < 24);

    h.manager.unhide(id);
    run_animations(&mut h);
    assert_eq!(h.manager.toplevel(id).unwrap().geometry(), Rect::new(0, 0, 1920, 24));
    assert_eq!(*unhiding.borrow(), 1);
}

#[test]
fn test_snapped_position_is_stable() {
    let mut h = single_monitor();
    let mut config = ToplevelConfig::new("top");
    config.expand = false;
    config.x = 30;
    let id = shown(&mut h.manager, &config);

    let first = h.manager.toplevel(id).unwrap().geometry();
    assert_eq!(first.x, 0);

    let calls = h.backend.calls().len();
    h.manager.set_size(id, 25);
    h.manager.set_size(id, 24);
    h.manager.flush();
    h.manager.flush();

    assert_eq!(h.manager.toplevel(id).unwrap().geometry(), first);
    assert!(h.backend.calls().len() <= calls + 1);
}

#[test]
fn test_config_file_drives_drawers() {
    let json = r#"{
        "toplevels": [
            { "id": "top", "orientation": "top" },
            { "id": "drawer", "attach_to": "top" }
        ]
    }"#;
    let config: PanelsConfig = serde_json::from_str(json).unwrap();

    let mut h = single_monitor();
    let applied = h.manager.apply_config(&config);
    assert_eq!(applied.created.len(), 2);
    h.manager.process_timers();

    let top = h.manager.find("top").unwrap();
    let drawer = h.manager.find("drawer").unwrap();
    let d = h.manager.toplevel(drawer).unwrap();
    assert_eq!(d.attached_to(), Some(top));
    assert_eq!(d.orientation(), Orientation::Left);
    assert!(h.manager.struts().find(drawer).is_none());

    let snapshot = h.manager.snapshot_config();
    assert_eq!(snapshot.toplevel("drawer").unwrap().attach_to.as_deref(), Some("top"));

    // Dropping the parent entry detaches the drawer
    let mut without_parent = snapshot.clone();
    without_parent.toplevels.retain(|t| t.id != "top");
    let applied = h.manager.apply_config(&without_parent);
    assert_eq!(applied.destroyed, vec![top]);
    assert!(!h.manager.toplevel(drawer).unwrap().is_attached());
}

#[test]
fn test_cancelled_move_restores_config() {
    let mut h = single_monitor();
    let id = shown(&mut h.manager, &ToplevelConfig::new("top"));
    let before = h.manager.snapshot_config();

    assert!(h.manager.begin_move(id));
    h.manager.key_press(id, GrabKey::Left, InputModifiers::empty());
    h.manager.key_press(id, GrabKey::Down, InputModifiers::SHIFT);
    h.manager.key_press(id, GrabKey::Escape, InputModifiers::empty());
    h.manager.flush();

    assert_eq!(h.manager.snapshot_config(), before);
    assert_eq!(h.manager.toplevel(id).unwrap().geometry(), Rect::new(0, 0, 1920, 24));
}
