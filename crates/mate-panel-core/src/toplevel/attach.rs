use tracing::{debug, info};

use crate::geometry::Rect;

use super::manager::PanelManager;
use super::state::{Attachment, ToplevelState};
use super::ToplevelId;

impl PanelManager {
    /// Turn `id` into a drawer hanging off `widget` inside `parent`.
    ///
    /// The drawer takes the orientation perpendicular to its parent, never
    /// expands, reserves no strut and, while shown, keeps its parent from
    /// auto-hiding.
    pub fn attach_to_widget(&mut self, id: ToplevelId, parent: ToplevelId, widget: Option<Rect>) {
        if id == parent || !self.toplevels.contains_key(&parent) {
            return;
        }
        if self.toplevels.get(&id).is_some_and(|t| t.is_attached()) {
            self.detach(id);
        }

        let Some(parent_orientation) = self.toplevels.get(&parent).map(|p| p.orientation) else {
            return;
        };
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };

        t.attachment = Some(Attachment {
            parent,
            widget,
            widget_mapped: true,
        });
        t.initial_animation_done = true;
        t.unhide_deadline = None;
        let shown = t.state == ToplevelState::Normal;

        info!("Toplevel {} attached to {}", id, parent);

        self.set_expand(id, false);
        self.set_orientation(id, parent_orientation.drawer_orientation());

        let change = self.struts.unregister_strut(&self.monitors, id);
        for other in change.others {
            self.mark_dirty(other);
        }

        if shown {
            self.push_autohide_disabler(parent);
        }
        self.mark_dirty(id);
    }

    /// Undo [`PanelManager::attach_to_widget`]
    pub fn detach(&mut self, id: ToplevelId) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        let Some(attachment) = t.attachment.take() else {
            return;
        };
        let shown = t.state == ToplevelState::Normal;
        t.hidden_by_parent = false;
        t.mapped = true;
        t.dirty = true;

        debug!("Toplevel {} detached from {}", id, attachment.parent);

        if shown {
            self.pop_autohide_disabler(attachment.parent);
        }
    }

    /// The widget a drawer hangs off got a new desktop rectangle
    pub fn set_attach_widget_geometry(&mut self, id: ToplevelId, widget: Rect) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        let Some(attachment) = t.attachment.as_mut() else {
            return;
        };
        if attachment.widget != Some(widget) {
            attachment.widget = Some(widget);
            t.dirty = true;
        }
    }

    /// The drawer's widget was mapped or unmapped; an unmapped widget takes
    /// the drawer with it
    pub fn attach_widget_mapped(&mut self, id: ToplevelId, mapped: bool) {
        let Some(t) = self.toplevels.get_mut(&id) else {
            return;
        };
        let Some(attachment) = t.attachment.as_mut() else {
            return;
        };
        attachment.widget_mapped = mapped;
        t.mapped = mapped && t.state == ToplevelState::Normal;
        t.dirty = true;
    }

    pub fn attach_widget_destroyed(&mut self, id: ToplevelId) {
        self.detach(id);
    }
}
