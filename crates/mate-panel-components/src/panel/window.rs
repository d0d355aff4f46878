use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use gtk4::prelude::*;
use gtk4::{gdk, graphene, Application, Box as GtkBox, Button, Orientation, Window};
use tracing::debug;

use mate_panel_core::{
    window_title, ContentRequest, GrabKey, GrabOp, InputModifiers, Orientation as PanelOrientation, Rect, Toplevel,
    ToplevelId, ToplevelState,
};

use crate::common::LayerWindow;

use super::{PanelDriver, PanelMenu};

fn modifiers(state: gdk::ModifierType) -> InputModifiers {
    let mut modifiers = InputModifiers::empty();
    if state.contains(gdk::ModifierType::SHIFT_MASK) {
        modifiers |= InputModifiers::SHIFT;
    }
    if state.contains(gdk::ModifierType::CONTROL_MASK) {
        modifiers |= InputModifiers::CONTROL;
    }
    modifiers
}

fn grab_key(key: gdk::Key) -> Option<GrabKey> {
    match key {
        gdk::Key::Up | gdk::Key::KP_Up => Some(GrabKey::Up),
        gdk::Key::Down | gdk::Key::KP_Down => Some(GrabKey::Down),
        gdk::Key::Left | gdk::Key::KP_Left => Some(GrabKey::Left),
        gdk::Key::Right | gdk::Key::KP_Right => Some(GrabKey::Right),
        gdk::Key::Escape => Some(GrabKey::Escape),
        gdk::Key::Return | gdk::Key::KP_Enter | gdk::Key::ISO_Enter => Some(GrabKey::Return),
        gdk::Key::space | gdk::Key::KP_Space => Some(GrabKey::Space),
        _ => None,
    }
}

/// Hidden state each hide button retracts toward: the start button goes
/// up (or left), the end button down (or right)
fn hide_directions(orientation: PanelOrientation) -> (ToplevelState, ToplevelState) {
    if orientation.is_horizontal() {
        (ToplevelState::HiddenUp, ToplevelState::HiddenDown)
    } else {
        (ToplevelState::HiddenLeft, ToplevelState::HiddenRight)
    }
}

/// Window-relative widget bounds in whole pixels
fn pixel_rect(bounds: &graphene::Rect) -> Rect {
    Rect::new(
        bounds.x().round() as i32,
        bounds.y().round() as i32,
        bounds.width().round() as i32,
        bounds.height().round() as i32,
    )
}

/// Place window-relative `bounds` on the desktop given the window's origin
fn desktop_rect(window: Rect, bounds: Rect) -> Rect {
    bounds.translated(window.x, window.y)
}

fn drawer_icon(parent: PanelOrientation) -> &'static str {
    match parent {
        PanelOrientation::Top => "pan-down-symbolic",
        PanelOrientation::Bottom => "pan-up-symbolic",
        PanelOrientation::Left => "pan-end-symbolic",
        PanelOrientation::Right => "pan-start-symbolic",
    }
}

fn arrow_icon(state: ToplevelState) -> &'static str {
    match state {
        ToplevelState::HiddenUp => "pan-up-symbolic",
        ToplevelState::HiddenDown => "pan-down-symbolic",
        ToplevelState::HiddenLeft => "pan-start-symbolic",
        _ => "pan-end-symbolic",
    }
}

/// The GTK window of one toplevel.
///
/// Input is forwarded to the engine through the driver; geometry comes back
/// through the placement backend.
pub struct PanelWindow {
    id: ToplevelId,
    window: Window,
    container: GtkBox,
    contents: GtkBox,
    start_button: Button,
    end_button: Button,
    menu: PanelMenu,
    /// Launcher button of each drawer hanging off this panel
    drawers: RefCell<AHashMap<ToplevelId, Button>>,
    /// Last allocation of each launcher, relative to the window
    drawer_bounds: Rc<RefCell<AHashMap<ToplevelId, Rect>>>,
}

impl PanelWindow {
    pub fn new(app: &Application, driver: &Rc<PanelDriver>, id: ToplevelId, layer_shell: bool) -> Self {
        let window = Window::builder()
            .application(app)
            .title(window_title(id).as_str())
            .decorated(false)
            .resizable(false)
            .build();
        window.add_css_class("mate-panel");

        if layer_shell {
            LayerWindow::init(&window);
        }

        let container = GtkBox::new(Orientation::Horizontal, 0);
        container.add_css_class("panel-container");

        let start_button = Button::new();
        start_button.add_css_class("hide-button");
        let end_button = Button::new();
        end_button.add_css_class("hide-button");

        let contents = GtkBox::new(Orientation::Horizontal, 0);
        contents.set_hexpand(true);
        contents.set_vexpand(true);

        container.append(&start_button);
        container.append(&contents);
        container.append(&end_button);
        window.set_child(Some(&container));

        let menu = PanelMenu::new(driver, id, &container);

        let panel = Self {
            id,
            window,
            container,
            contents,
            start_button,
            end_button,
            menu,
            drawers: RefCell::new(AHashMap::new()),
            drawer_bounds: Rc::new(RefCell::new(AHashMap::new())),
        };
        panel.connect_buttons(driver);
        panel.connect_input(driver);
        panel
    }

    fn connect_buttons(&self, driver: &Rc<PanelDriver>) {
        let id = self.id;

        for start in [true, false] {
            let button = if start { &self.start_button } else { &self.end_button };
            let weak = Rc::downgrade(driver);
            button.connect_clicked(move |_| {
                let Some(driver) = weak.upgrade() else {
                    return;
                };
                driver.run(move |manager| {
                    let Some(t) = manager.toplevel(id) else {
                        return;
                    };
                    if t.state() != ToplevelState::Normal {
                        manager.unhide(id);
                        return;
                    }
                    let (up, down) = hide_directions(t.orientation());
                    manager.hide(id, false, Some(if start { up } else { down }));
                });
            });
        }
    }

    fn connect_input(&self, driver: &Rc<PanelDriver>) {
        let id = self.id;

        let realize_driver = Rc::downgrade(driver);
        self.window.connect_realize(move |_| {
            with_driver(&realize_driver, move |driver| driver.run(move |m| m.realize(id)));
        });

        let motion = gtk4::EventControllerMotion::new();
        let weak = Rc::downgrade(driver);
        motion.connect_enter(move |_, _, _| {
            with_driver(&weak, move |driver| driver.run(move |m| m.pointer_enter(id)));
        });
        let weak = Rc::downgrade(driver);
        motion.connect_leave(move |_| {
            with_driver(&weak, move |driver| driver.run(move |m| m.pointer_leave(id)));
        });
        let weak = Rc::downgrade(driver);
        motion.connect_motion(move |controller, x, y| {
            let mods = modifiers(controller.current_event_state());
            with_driver(&weak, move |driver| {
                driver.run(move |m| {
                    let Some(origin) = m.toplevel(id).map(|t| t.geometry()) else {
                        return;
                    };
                    m.pointer_motion(origin.x + x as i32, origin.y + y as i32, mods);
                })
            });
        });
        self.window.add_controller(motion);

        // Middle button drags the panel, secondary button opens the menu
        let click = gtk4::GestureClick::new();
        click.set_button(0);
        let weak = Rc::downgrade(driver);
        click.connect_pressed(move |gesture, _, _, _| {
            let button = gesture.current_button();
            with_driver(&weak, move |driver| match button {
                2 => driver.run(move |m| {
                    m.begin_grab_op(id, GrabOp::Move, false);
                }),
                3 => driver.run(move |m| m.popup_panel_menu(id)),
                _ => {}
            });
        });
        let weak = Rc::downgrade(driver);
        click.connect_released(move |gesture, _, _, _| {
            if gesture.current_button() != 2 {
                return;
            }
            with_driver(&weak, move |driver| {
                driver.run(move |m| {
                    if m.toplevel(id).and_then(|t| t.grab_op()).is_some() {
                        m.end_grab_op(id);
                    }
                })
            });
        });
        self.window.add_controller(click);

        let keys = gtk4::EventControllerKey::new();
        let weak = Rc::downgrade(driver);
        keys.connect_key_pressed(move |_, key, _, state| {
            let Some(key) = grab_key(key) else {
                return glib::Propagation::Proceed;
            };
            let Some(driver) = weak.upgrade() else {
                return glib::Propagation::Proceed;
            };
            let consumed = driver
                .try_run(|m| m.key_press(id, key, modifiers(state)))
                .unwrap_or(false);
            if consumed {
                glib::Propagation::Stop
            } else {
                glib::Propagation::Proceed
            }
        });
        self.window.add_controller(keys);

        let focus = gtk4::EventControllerFocus::new();
        let weak = Rc::downgrade(driver);
        focus.connect_enter(move |_| {
            with_driver(&weak, move |driver| driver.run(move |m| m.focus_in(id)));
        });
        let weak = Rc::downgrade(driver);
        focus.connect_leave(move |_| {
            with_driver(&weak, move |driver| driver.run(move |m| m.focus_out(id)));
        });
        self.window.add_controller(focus);
    }

    pub fn id(&self) -> ToplevelId {
        self.id
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Follow the toplevel's orientation and hide-button state
    pub fn sync(&self, toplevel: &Toplevel) {
        let orientation = if toplevel.orientation().is_horizontal() {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        if self.container.orientation() != orientation {
            debug!("Toplevel {} lays out {:?}", self.id, orientation);
            self.container.set_orientation(orientation);
            self.contents.set_orientation(orientation);
        }

        let visible = toplevel.hide_buttons_visible();
        let (up, down) = hide_directions(toplevel.orientation());
        for (button, direction) in [(&self.start_button, up), (&self.end_button, down)] {
            button.set_visible(visible);
            if toplevel.arrows_enabled() {
                button.set_icon_name(arrow_icon(direction));
            } else {
                button.set_child(None::<&gtk4::Widget>);
            }
        }
    }

    /// Keep one launcher button per drawer attached to this panel
    pub fn sync_drawers(&self, driver: &Rc<PanelDriver>, orientation: PanelOrientation, drawers: &[ToplevelId]) {
        let mut buttons = self.drawers.borrow_mut();
        buttons.retain(|drawer, button| {
            let keep = drawers.contains(drawer);
            if !keep {
                debug!("Removing launcher of drawer {} from toplevel {}", drawer, self.id);
                self.contents.remove(button);
                self.drawer_bounds.borrow_mut().remove(drawer);
            }
            keep
        });

        for &drawer in drawers {
            if !buttons.contains_key(&drawer) {
                let button = self.drawer_button(driver, drawer);
                self.contents.append(&button);
                buttons.insert(drawer, button);
            }
        }

        for button in buttons.values() {
            button.set_icon_name(drawer_icon(orientation));
        }
    }

    /// Desktop rectangles of the drawer launchers, given where this window sits
    pub fn drawer_widgets(&self, window: Rect) -> Vec<(ToplevelId, Rect)> {
        self.drawer_bounds
            .borrow()
            .iter()
            .map(|(drawer, bounds)| (*drawer, desktop_rect(window, *bounds)))
            .collect()
    }

    fn drawer_button(&self, driver: &Rc<PanelDriver>, drawer: ToplevelId) -> Button {
        let parent = self.id;
        let button = Button::new();
        button.add_css_class("drawer-button");

        let weak = Rc::downgrade(driver);
        button.connect_clicked(move |_| {
            with_driver(&weak, move |driver| driver.run(move |m| m.toggle_hidden(drawer)));
        });

        // Only report for a drawer still hanging off this panel; a launcher
        // being removed may unmap after the drawer moved elsewhere
        let report_mapped = move |weak: &Weak<PanelDriver>, mapped: bool| {
            with_driver(weak, move |driver| {
                driver.run(move |m| {
                    if m.toplevel(drawer).and_then(|t| t.attached_to()) == Some(parent) {
                        m.attach_widget_mapped(drawer, mapped);
                    }
                })
            });
        };
        let weak = Rc::downgrade(driver);
        button.connect_map(move |_| report_mapped(&weak, true));
        let weak = Rc::downgrade(driver);
        button.connect_unmap(move |_| report_mapped(&weak, false));

        // Allocation settles after layout; watch it once per frame
        let bounds = self.drawer_bounds.clone();
        let weak = Rc::downgrade(driver);
        button.add_tick_callback(move |button, _| {
            let Some(root) = button.root() else {
                return glib::ControlFlow::Continue;
            };
            let Some(rect) = button.compute_bounds(&root).map(|b| pixel_rect(&b)) else {
                return glib::ControlFlow::Continue;
            };
            let changed = bounds.borrow_mut().insert(drawer, rect) != Some(rect);
            if changed {
                with_driver(&weak, |driver| driver.sync_drawer_widgets());
            }
            glib::ControlFlow::Continue
        });

        button
    }

    /// Natural size of the contents along and across the panel
    pub fn content_request(&self, orientation: PanelOrientation) -> ContentRequest {
        let (along, across) = if orientation.is_horizontal() {
            (Orientation::Horizontal, Orientation::Vertical)
        } else {
            (Orientation::Vertical, Orientation::Horizontal)
        };
        let (_, length, _, _) = self.contents.measure(along, -1);
        let (minimum, thickness, _, _) = self.contents.measure(across, -1);

        ContentRequest {
            length,
            thickness,
            minimum_thickness: minimum,
            applet_sizes: Vec::new(),
        }
    }

    pub fn popup_menu(&self) {
        self.menu.popup();
    }

    pub fn destroy(&self) {
        self.menu.unparent();
        self.window.destroy();
    }
}

fn with_driver(weak: &Weak<PanelDriver>, f: impl FnOnce(&Rc<PanelDriver>)) {
    if let Some(driver) = weak.upgrade() {
        f(&driver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(grab_key(gdk::Key::KP_Up), Some(GrabKey::Up));
        assert_eq!(grab_key(gdk::Key::space), Some(GrabKey::Space));
        assert_eq!(grab_key(gdk::Key::a), None);
    }

    #[test]
    fn test_modifier_mapping() {
        let mods = modifiers(gdk::ModifierType::SHIFT_MASK | gdk::ModifierType::ALT_MASK);
        assert_eq!(mods, InputModifiers::SHIFT);
    }

    #[test]
    fn test_launcher_bounds_on_desktop() {
        let bounds = pixel_rect(&graphene::Rect::new(120.4, 0.0, 23.6, 24.0));
        assert_eq!(bounds, Rect::new(120, 0, 24, 24));
        assert_eq!(desktop_rect(Rect::new(1920, 1056, 1920, 24), bounds), Rect::new(2040, 1056, 24, 24));
    }

    #[test]
    fn test_hide_buttons_follow_axis() {
        assert_eq!(
            hide_directions(PanelOrientation::Bottom),
            (ToplevelState::HiddenUp, ToplevelState::HiddenDown)
        );
        assert_eq!(
            hide_directions(PanelOrientation::Left),
            (ToplevelState::HiddenLeft, ToplevelState::HiddenRight)
        );
    }
}
