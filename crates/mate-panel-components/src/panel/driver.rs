use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use gtk4::prelude::*;
use gtk4::Application;
use tracing::{debug, info, warn};

use mate_panel_core::{PanelManager, PanelsConfig, Rect, ToplevelEvent, ToplevelId};

use crate::common::WindowRegistry;

use super::PanelWindow;

/// Quiet period after the last property change before the layout is saved
const SAVE_DELAY: Duration = Duration::from_millis(500);

type SaveHandler = Box<dyn Fn(PanelsConfig)>;

/// Runs a [`PanelManager`] inside the GTK main loop.
///
/// Owns the panel windows, turns engine deadlines into glib timeouts and
/// reacts to engine events once each operation has returned.
pub struct PanelDriver {
    manager: RefCell<PanelManager>,
    app: Application,
    windows: WindowRegistry,
    panels: RefCell<AHashMap<ToplevelId, PanelWindow>>,
    events: Rc<RefCell<Vec<(ToplevelId, ToplevelEvent)>>>,
    layer_shell: bool,
    timer: RefCell<Option<glib::SourceId>>,
    save_timer: RefCell<Option<glib::SourceId>>,
    on_save: RefCell<Option<SaveHandler>>,
}

impl PanelDriver {
    /// `windows` must be the registry the manager's backend places into
    pub fn new(app: &Application, mut manager: PanelManager, windows: WindowRegistry, layer_shell: bool) -> Rc<Self> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        manager.subscribe(move |id, event| sink.borrow_mut().push((id, event)));

        Rc::new(Self {
            manager: RefCell::new(manager),
            app: app.clone(),
            windows,
            panels: RefCell::new(AHashMap::new()),
            events,
            layer_shell,
            timer: RefCell::new(None),
            save_timer: RefCell::new(None),
            on_save: RefCell::new(None),
        })
    }

    /// Called with the live layout whenever it changed and settled
    pub fn set_save_handler(&self, handler: impl Fn(PanelsConfig) + 'static) {
        *self.on_save.borrow_mut() = Some(Box::new(handler));
    }

    /// Run `f` against the manager now, or on the next idle when the
    /// manager is busy (GTK can emit signals from inside a placement).
    pub fn run(self: &Rc<Self>, f: impl FnOnce(&mut PanelManager) + 'static) {
        if self.manager.try_borrow_mut().is_err() {
            let driver = Rc::downgrade(self);
            glib::idle_add_local_once(move || {
                if let Some(driver) = driver.upgrade() {
                    driver.run(f);
                }
            });
            return;
        }
        self.try_run(f);
    }

    /// Run `f` against the manager unless it is busy
    pub fn try_run<R>(self: &Rc<Self>, f: impl FnOnce(&mut PanelManager) -> R) -> Option<R> {
        let result = {
            let Ok(mut manager) = self.manager.try_borrow_mut() else {
                debug!("Panel manager busy, dropping reentrant call");
                return None;
            };
            let result = f(&mut manager);
            manager.flush();
            result
        };

        self.after_change();
        Some(result)
    }

    pub fn apply_config(self: &Rc<Self>, config: PanelsConfig) {
        self.run(move |m| {
            let applied = m.apply_config(&config);
            info!(
                "Layout applied: {} created, {} destroyed",
                applied.created.len(),
                applied.destroyed.len()
            );
        });
    }

    pub fn reinit_monitors(self: &Rc<Self>) {
        self.run(|m| m.reinit_monitors());
    }

    fn after_change(self: &Rc<Self>) {
        let events: Vec<_> = self.events.borrow_mut().drain(..).collect();
        let mut save = false;

        for (id, event) in events {
            match event {
                ToplevelEvent::PropertyChanged(property) => {
                    debug!("Toplevel {} changed {:?}", id, property);
                    save = true;
                }
                ToplevelEvent::PopupMenuRequested => {
                    if let Some(panel) = self.panels.borrow().get(&id) {
                        panel.popup_menu();
                    }
                }
                other => debug!("Toplevel {} {:?}", id, other),
            }
        }

        self.sync_windows();
        self.schedule_timer();
        if save {
            self.schedule_save();
        }
    }

    /// Create and destroy windows to match the manager, then refresh them
    fn sync_windows(self: &Rc<Self>) {
        let Ok(manager) = self.manager.try_borrow() else {
            return;
        };
        let live: Vec<ToplevelId> = manager.toplevels().map(|t| t.id()).collect();

        for id in self.windows.ids() {
            if !live.contains(&id) {
                self.windows.remove(id);
                let removed = self.panels.borrow_mut().remove(&id);
                if let Some(panel) = removed {
                    debug!("Destroying window of toplevel {}", id);
                    panel.destroy();
                }
            }
        }

        let mut created = Vec::new();
        for id in &live {
            if self.windows.contains(*id) {
                continue;
            }
            let panel = PanelWindow::new(&self.app, self, *id, self.layer_shell);
            self.windows.insert(*id, panel.window().clone());
            self.panels.borrow_mut().insert(*id, panel);
            created.push(*id);
        }

        for panel in self.panels.borrow().values() {
            let Some(toplevel) = manager.toplevel(panel.id()) else {
                continue;
            };
            panel.sync(toplevel);

            let drawers: Vec<ToplevelId> = manager
                .toplevels()
                .filter(|t| t.attached_to() == Some(panel.id()))
                .map(|t| t.id())
                .collect();
            panel.sync_drawers(self, toplevel.orientation(), &drawers);
        }
        drop(manager);

        self.sync_drawer_widgets();

        if created.is_empty() {
            return;
        }

        let requests: Vec<_> = {
            let manager = self.manager.borrow();
            let panels = self.panels.borrow();
            created
                .iter()
                .filter_map(|id| {
                    let orientation = manager.toplevel(*id)?.orientation();
                    Some((*id, panels.get(id)?.content_request(orientation)))
                })
                .collect()
        };

        self.try_run(move |m| {
            for (id, request) in requests {
                m.set_content_request(id, request);
                m.invalidate_placement(id);
            }
        });
    }

    /// Tell the engine where each drawer's launcher sits on the desktop
    pub fn sync_drawer_widgets(self: &Rc<Self>) {
        let updates: Vec<(ToplevelId, Rect)> = {
            let Ok(manager) = self.manager.try_borrow() else {
                return;
            };
            let panels = self.panels.borrow();

            let mut updates = Vec::new();
            for panel in panels.values() {
                let Some(parent) = manager.toplevel(panel.id()) else {
                    continue;
                };
                for (drawer, rect) in panel.drawer_widgets(parent.geometry()) {
                    let stale = manager
                        .toplevel(drawer)
                        .is_some_and(|t| t.attached_to() == Some(parent.id()) && t.attach_widget() != Some(rect));
                    if stale {
                        updates.push((drawer, rect));
                    }
                }
            }
            updates
        };

        if updates.is_empty() {
            return;
        }
        self.try_run(move |m| {
            for (drawer, rect) in updates {
                m.set_attach_widget_geometry(drawer, rect);
            }
        });
    }

    /// Arm a single glib timeout for the earliest engine deadline
    fn schedule_timer(self: &Rc<Self>) {
        if let Some(source) = self.timer.borrow_mut().take() {
            source.remove();
        }

        let Some(deadline) = self.manager.try_borrow().ok().and_then(|m| m.next_deadline()) else {
            return;
        };
        let delay = deadline.saturating_duration_since(Instant::now());

        let driver = Rc::downgrade(self);
        let source = glib::timeout_add_local_once(delay, move || {
            let Some(driver) = driver.upgrade() else {
                return;
            };
            driver.timer.borrow_mut().take();
            driver.run(|m| m.process_timers());
        });
        *self.timer.borrow_mut() = Some(source);
    }

    fn schedule_save(self: &Rc<Self>) {
        if let Some(source) = self.save_timer.borrow_mut().take() {
            source.remove();
        }

        let driver = Rc::downgrade(self);
        let source = glib::timeout_add_local_once(SAVE_DELAY, move || {
            let Some(driver) = driver.upgrade() else {
                return;
            };
            driver.save_timer.borrow_mut().take();

            let Ok(manager) = driver.manager.try_borrow() else {
                warn!("Panel manager busy, layout not saved");
                return;
            };
            let config = manager.snapshot_config();
            drop(manager);

            if let Some(handler) = driver.on_save.borrow().as_ref() {
                handler(config);
            }
        });
        *self.save_timer.borrow_mut() = Some(source);
    }
}
