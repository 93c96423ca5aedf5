//! SatWatch - Satellite Tracking Visualizer
//!
//! Fetches element sets by category, classifies them by orbit regime and
//! propagates them with SGP4 on a simulated clock, drawing positions, paths
//! and ground tracks over an overhead map or a 3D globe.

mod config;
mod data;
mod propagation;
mod renderer;
mod ui;

use std::time::Instant;

use anyhow::{Context, Result};
use eframe::egui;

use config::{TrackerConfig, CONFIG_FILE};
use data::{CelestrakSource, FetchRequest, FleetLoader, FleetSelection, ObjectId};
use propagation::{FrameTicker, GeodeticPosition, SimulationClock, TrackBuilder};
use renderer::{DetachedSink, RenderInitError, RenderSink, Scene};
use ui::{clamp_rate, BrowserPanel, DetailPanel, FleetAction, FleetPanel, TimeAction, TimeControls};

/// Above this many tracked objects, ground tracks are drawn only for the
/// selected object
const GROUND_TRACK_FLEET_LIMIT: usize = 25;

/// Application state
pub struct SatWatchApp {
    // Fleet
    fleet: FleetSelection,
    loader: FleetLoader<CelestrakSource>,

    // Propagation
    tracks: TrackBuilder,
    clock: SimulationClock,
    ticker: FrameTicker,
    needs_refresh: bool,

    // Rendering
    scene: Result<Scene, RenderInitError>,
    detached: DetachedSink,

    // UI state
    fleet_panel: FleetPanel,
    browser_panel: BrowserPanel,
    time_controls: TimeControls,
    selected_object: Option<ObjectId>,

    // Dropped last; shuts down pending fetches
    _runtime: tokio::runtime::Runtime,
}

/// The scene when it initialized, otherwise a sink that discards everything
fn render_sink<'a>(
    scene: &'a mut Result<Scene, RenderInitError>,
    detached: &'a mut DetachedSink,
) -> &'a mut dyn RenderSink {
    match scene {
        Ok(scene) => scene,
        Err(_) => detached,
    }
}

impl SatWatchApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Result<Self> {
        let config = TrackerConfig::load_or_default(CONFIG_FILE)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("satwatch-fetch")
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;

        let source = CelestrakSource::new(config.source_base_url.clone(), config.request_timeout())?;
        let loader = FleetLoader::new(source, runtime.handle().clone());
        let fleet = FleetSelection::new(config.initial_orbit_types.iter().copied());

        let mut clock = SimulationClock::starting_now()?;
        clock.set_rate(clamp_rate(config.initial_rate))?;
        let mut ticker = FrameTicker::new();
        ticker.start(Instant::now());

        let scene = Scene::new(&cc.egui_ctx, config.earth_texture.as_deref());
        if let Err(e) = &scene {
            log::error!("Failed to initialize renderer: {}", e);
        }

        let mut app = Self {
            fleet,
            loader,
            tracks: TrackBuilder::new(config.path_window, config.ground_track_window),
            clock,
            ticker,
            needs_refresh: true,
            scene,
            detached: DetachedSink,
            fleet_panel: FleetPanel,
            browser_panel: BrowserPanel,
            time_controls: TimeControls::new(config.initial_rate, config.layers),
            selected_object: None,
            _runtime: runtime,
        };

        if let Some(request) = app.fleet.set_categories(config.initial_categories.clone()) {
            app.request_fetch(request, &cc.egui_ctx);
        }

        Ok(app)
    }

    fn request_fetch(&self, request: FetchRequest, ctx: &egui::Context) {
        log::info!(
            "Requesting categories {:?} (generation {})",
            request.categories,
            request.generation
        );
        let ctx = ctx.clone();
        self.loader.request(request, move || ctx.request_repaint());
    }

    fn rebuild_tracks(&mut self) {
        let sink = render_sink(&mut self.scene, &mut self.detached);
        self.tracks.rebuild(self.fleet.visible(), sink);

        if self
            .selected_object
            .as_ref()
            .is_some_and(|id| self.tracks.get(id).is_none())
        {
            self.selected_object = None;
        }
        self.needs_refresh = true;
    }

    fn apply_fleet_action(&mut self, action: FleetAction, ctx: &egui::Context) {
        match action {
            FleetAction::SetCategories(keys) => {
                if let Some(request) = self.fleet.set_categories(keys) {
                    self.request_fetch(request, ctx);
                } else {
                    // Empty selection clears the fleet at once
                    self.rebuild_tracks();
                }
            }
            FleetAction::SetOrbitTypes(types) => {
                self.fleet.set_orbit_types(types);
                self.rebuild_tracks();
            }
        }
    }

    fn apply_time_action(&mut self, action: TimeAction) {
        match action {
            TimeAction::Play => {
                self.clock.resume();
                self.ticker.start(Instant::now());
            }
            TimeAction::Pause => {
                self.clock.pause();
                self.ticker.cancel();
            }
            TimeAction::SetRate(rate) => {
                if let Err(e) = self.clock.set_rate(rate) {
                    log::warn!("{}", e);
                }
            }
            TimeAction::ResetToNow => match self.clock.reset_to_now() {
                Ok(()) => self.needs_refresh = true,
                Err(e) => log::warn!("{}", e),
            },
            TimeAction::SetViewMode(mode) => {
                let sink = render_sink(&mut self.scene, &mut self.detached);
                self.tracks.set_view_mode(mode, sink);
            }
        }
    }

    /// Ground tracks to draw this frame, pulled from the track builder
    fn ground_tracks(&self) -> Vec<Vec<GeodeticPosition>> {
        if !self.time_controls.layers.ground_tracks {
            return Vec::new();
        }
        let time = self.clock.current_time();

        if let Some(id) = &self.selected_object {
            return vec![self.tracks.ground_track(id, &time)];
        }
        if self.tracks.len() > GROUND_TRACK_FLEET_LIMIT {
            return Vec::new();
        }
        self.tracks
            .objects()
            .map(|object| self.tracks.ground_track(object.id(), &time))
            .collect()
    }

    /// Stop the frame ticker and release every render entity
    fn teardown(&mut self) {
        self.ticker.cancel();
        let sink = render_sink(&mut self.scene, &mut self.detached);
        self.tracks.release_all(sink);
    }
}

impl eframe::App for SatWatchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.loader.drain(&mut self.fleet) {
            self.rebuild_tracks();
        }

        if let Some(elapsed) = self.ticker.tick(Instant::now()) {
            self.clock.advance(elapsed);
            self.needs_refresh = true;
        }

        if self.needs_refresh {
            let time = self.clock.current_time();
            let sink = render_sink(&mut self.scene, &mut self.detached);
            self.tracks
                .refresh_samples(&time, &self.time_controls.layers, sink);
            self.needs_refresh = false;
        }

        // Top panel with time controls
        let mut time_actions = Vec::new();
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("SatWatch");
                ui.separator();
                time_actions = self.time_controls.show_top_bar(ui, &self.clock);
                ui.separator();
                ui.label(format!("Tracking: {}", self.tracks.len()));
                if let Ok(scene) = &self.scene {
                    ui.label(format!("Drawn: {}", scene.entity_count()));
                }
            });
        });

        // Left panel with fleet selection, layers and the object browser
        let mut fleet_actions = Vec::new();
        let layers_before = self.time_controls.layers;
        egui::SidePanel::left("left_panel")
            .default_width(280.0)
            .show(ctx, |ui| {
                fleet_actions = self.fleet_panel.show(ui, &self.fleet);
                ui.separator();

                if let Some(action) = self.time_controls.show_view_settings(ui) {
                    time_actions.push(action);
                }
                ui.separator();

                if let Some(new_sel) =
                    self.browser_panel
                        .show(ui, &self.tracks, self.selected_object.as_ref())
                {
                    self.selected_object = Some(new_sel);
                }
            });
        if self.time_controls.layers != layers_before {
            self.needs_refresh = true;
        }

        for action in fleet_actions {
            self.apply_fleet_action(action, ctx);
        }
        for action in time_actions {
            self.apply_time_action(action);
        }

        // Right panel with object details (if selected)
        if let Some(id) = self.selected_object.clone() {
            let mut deselect = false;
            if let Some(object) = self.tracks.get(&id) {
                let time = self.clock.current_time();
                egui::SidePanel::right("right_panel")
                    .default_width(300.0)
                    .show(ctx, |ui| {
                        DetailPanel::show(ui, object, &time);
                        ui.separator();
                        if ui.button("Deselect").clicked() {
                            deselect = true;
                        }
                    });
            }
            if deselect {
                self.selected_object = None;
            }
        }

        // Central panel with the scene
        let ground_tracks = self.ground_tracks();
        egui::CentralPanel::default().show(ctx, |ui| match &mut self.scene {
            Ok(scene) => scene.show(ui, &self.time_controls.layers, &ground_tracks),
            Err(e) => {
                ui.centered_and_justified(|ui| {
                    ui.colored_label(
                        egui::Color32::from_rgb(220, 90, 90),
                        format!("Visualization unavailable\n\n{}", e),
                    );
                });
            }
        });

        if self.needs_refresh {
            ctx.request_repaint();
        } else if self.ticker.is_active() {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("Shutting down");
        self.teardown();
    }
}

impl Drop for SatWatchApp {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting SatWatch...");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1600.0, 900.0])
            .with_title("SatWatch - Satellite Tracker"),
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };

    eframe::run_native(
        "SatWatch",
        options,
        Box::new(|cc| match SatWatchApp::new(cc) {
            Ok(app) => Ok(Box::new(app)),
            Err(e) => {
                log::error!("Failed to initialize app: {}", e);
                Err(e.into())
            }
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))
}
