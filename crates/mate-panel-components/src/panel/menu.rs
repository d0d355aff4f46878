use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{Box as GtkBox, Button, Orientation, Popover};

use mate_panel_core::{PanelManager, ToplevelId};

use super::PanelDriver;

/// Context menu of a panel: move, resize, expand and hide
pub struct PanelMenu {
    popover: Popover,
}

impl PanelMenu {
    pub fn new(driver: &Rc<PanelDriver>, id: ToplevelId, parent: &impl IsA<gtk4::Widget>) -> Self {
        let popover = Popover::new();
        popover.set_has_arrow(false);
        popover.set_parent(parent);

        let menu_box = GtkBox::new(Orientation::Vertical, 2);
        menu_box.add_css_class("panel-menu");

        let entries: [(&str, fn(&mut PanelManager, ToplevelId)); 4] = [
            ("Move", |m, id| {
                m.begin_move(id);
            }),
            ("Resize", |m, id| {
                m.begin_resize(id);
            }),
            ("Expand", |m, id| {
                m.toggle_expand(id);
            }),
            ("Hide", |m, id| m.toggle_hidden(id)),
        ];

        for (label, action) in entries {
            let button = Button::with_label(label);
            let weak = Rc::downgrade(driver);
            let pop = popover.clone();
            button.connect_clicked(move |_| {
                pop.popdown();
                if let Some(driver) = weak.upgrade() {
                    driver.run(move |m| action(m, id));
                }
            });
            menu_box.append(&button);
        }

        popover.set_child(Some(&menu_box));
        Self { popover }
    }

    pub fn popup(&self) {
        self.popover.popup();
    }

    pub fn unparent(&self) {
        self.popover.unparent();
    }
}
