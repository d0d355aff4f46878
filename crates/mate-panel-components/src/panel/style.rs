use gtk4::gdk::Display;
use gtk4::CssProvider;
use tracing::debug;

use mate_panel_core::PanelEdges;

/// Panel frame theme. Bevels are drawn only on the `edge-*` sides the
/// engine picks, so a docked panel has no border against the screen edge.
pub const PANEL_CSS: &str = r#"
/* ========== Panel Window ========== */

window.mate-panel {
    background-color: rgba(30, 30, 30, 0.85);
}

.panel-container {
    background: linear-gradient(
        to bottom,
        rgba(255, 255, 255, 0.12) 0%,
        rgba(255, 255, 255, 0.05) 50%,
        rgba(0, 0, 0, 0.1) 100%
    );
}

window.mate-panel.vertical .panel-container {
    background: linear-gradient(
        to right,
        rgba(255, 255, 255, 0.12) 0%,
        rgba(255, 255, 255, 0.05) 50%,
        rgba(0, 0, 0, 0.1) 100%
    );
}

/* ========== Frame Edges ========== */

window.mate-panel.edge-top .panel-container {
    border-top: 1px solid rgba(255, 255, 255, 0.15);
}

window.mate-panel.edge-bottom .panel-container {
    border-bottom: 1px solid rgba(0, 0, 0, 0.4);
}

window.mate-panel.edge-left .panel-container {
    border-left: 1px solid rgba(255, 255, 255, 0.15);
}

window.mate-panel.edge-right .panel-container {
    border-right: 1px solid rgba(0, 0, 0, 0.4);
}

/* ========== Hide Buttons ========== */

.hide-button {
    background: rgba(255, 255, 255, 0.06);
    border: none;
    border-radius: 0;
    padding: 0;
    min-width: 10px;
    min-height: 10px;
    color: rgba(255, 255, 255, 0.7);
}

.hide-button:hover {
    background: rgba(255, 255, 255, 0.18);
}

/* ========== Drawer Launchers ========== */

.drawer-button {
    background: transparent;
    border: none;
    border-radius: 4px;
    padding: 2px;
    color: #ffffff;
}

.drawer-button:hover {
    background: rgba(255, 255, 255, 0.12);
}

/* ========== Panel Menu ========== */

.panel-menu {
    padding: 4px;
}

.panel-menu button {
    background: transparent;
    border: none;
    border-radius: 6px;
    padding: 4px 14px;
    color: rgba(255, 255, 255, 0.9);
}

.panel-menu button:hover {
    background: rgba(255, 255, 255, 0.15);
}
"#;

/// CSS classes for the frame sides in `edges`
pub fn edge_classes(edges: PanelEdges) -> impl Iterator<Item = &'static str> {
    [
        (PanelEdges::TOP, "edge-top"),
        (PanelEdges::BOTTOM, "edge-bottom"),
        (PanelEdges::LEFT, "edge-left"),
        (PanelEdges::RIGHT, "edge-right"),
    ]
    .into_iter()
    .filter(move |(edge, _)| edges.contains(*edge))
    .map(|(_, class)| class)
}

pub const ALL_EDGE_CLASSES: [&str; 4] = ["edge-top", "edge-bottom", "edge-left", "edge-right"];

/// Load and apply the panel CSS theme
pub fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_data(PANEL_CSS);

    if let Some(display) = Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
        debug!("Panel CSS loaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_classes() {
        let classes: Vec<_> = edge_classes(PanelEdges::TOP | PanelEdges::RIGHT).collect();
        assert_eq!(classes, vec!["edge-top", "edge-right"]);
        assert_eq!(edge_classes(PanelEdges::empty()).count(), 0);
    }
}
