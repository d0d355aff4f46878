use std::rc::Rc;
use std::sync::Arc;

use gtk4::prelude::*;
use gtk4::{gdk, Application};
use tracing::{error, info, warn};

use mate_panel_components::{
    load_css, GdkMonitorSource, LayerShellBackend, PanelDriver, SurfaceBackend, WindowRegistry,
};
#[cfg(feature = "x11")]
use mate_panel_core::{RandrMonitorSource, X11StrutBackend};
use mate_panel_core::{
    ConfigPaths, MonitorRegistry, MonitorSource, PanelManager, PanelsConfig, ServiceHub, ShellCommand, ShellEvent,
    SystemClock,
};

const APP_ID: &str = "org.mate.panel";

/// Monitor sources in order of preference.
///
/// On X11 RandR knows primary and built-in outputs; under a layer-shell
/// compositor only GDK sees the real outputs.
pub fn monitor_sources(layer_shell: bool) -> Vec<Box<dyn MonitorSource>> {
    let mut sources: Vec<Box<dyn MonitorSource>> = Vec::new();

    #[cfg(feature = "x11")]
    if !layer_shell {
        sources.push(Box::new(RandrMonitorSource::new()));
    }
    #[cfg(not(feature = "x11"))]
    let _ = layer_shell;

    sources.push(Box::new(GdkMonitorSource::new()));
    sources
}

/// Layer shell when the compositor offers it, X11 struts otherwise
fn platform_backend(windows: &WindowRegistry, layer_shell: bool) -> SurfaceBackend {
    if layer_shell {
        info!("Placing panels through wlr-layer-shell");
        return SurfaceBackend::new(Box::new(LayerShellBackend::new(windows.clone())), windows.clone());
    }

    #[cfg(feature = "x11")]
    match X11StrutBackend::connect() {
        Ok(backend) => {
            info!("Placing panels through X11 struts");
            return SurfaceBackend::new(Box::new(backend), windows.clone());
        }
        Err(e) => warn!("X11 placement unavailable: {}", e),
    }

    warn!("No platform placement available, panels will not reserve space");
    SurfaceBackend::gtk_only(windows.clone())
}

/// Run the panel daemon
pub fn run(paths: ConfigPaths) -> anyhow::Result<()> {
    info!("Initializing MATE panel");

    // Create service hub (starts tokio runtime and the config watcher)
    let services = Arc::new(ServiceHub::new(paths.clone())?);
    let _guard = services.enter_runtime();

    let config = PanelsConfig::load(&paths.panels_config);

    let app = Application::builder()
        .application_id(APP_ID)
        .flags(gtk4::gio::ApplicationFlags::NON_UNIQUE)
        .build();

    let services_clone = services.clone();

    app.connect_activate(move |app| {
        load_css();

        let layer_shell = LayerShellBackend::is_supported();
        let windows = WindowRegistry::new();
        let backend = platform_backend(&windows, layer_shell);

        let manager = PanelManager::new(
            MonitorRegistry::new(monitor_sources(layer_shell)),
            Box::new(backend),
            Box::new(SystemClock),
            config.engine.clone(),
        );
        let driver = PanelDriver::new(app, manager, windows, layer_shell);

        let hub = services_clone.clone();
        driver.set_save_handler(move |layout| hub.send_command(ShellCommand::SaveConfig(layout)));
        driver.apply_config(config.clone());

        if let Some(display) = gdk::Display::default() {
            let weak = Rc::downgrade(&driver);
            display.monitors().connect_items_changed(move |_, _, _, _| {
                if let Some(driver) = weak.upgrade() {
                    info!("Monitor layout changed");
                    driver.reinit_monitors();
                }
            });
        }

        // Layout file changes from the config watcher
        let event_rx = services_clone.event_receiver();
        glib::spawn_future_local(async move {
            while let Ok(event) = event_rx.recv().await {
                match event {
                    ShellEvent::ConfigReloaded(layout) => driver.apply_config(layout),
                    ShellEvent::ConfigInvalid(reason) => {
                        error!("Keeping current panels, layout file is invalid: {}", reason)
                    }
                }
            }
        });

        info!("MATE panel activated");
    });

    // Arguments were already parsed by clap
    let exit_code = app.run_with_args::<&str>(&[]);

    info!("MATE panel exiting");

    std::process::exit(exit_code.into());
}
