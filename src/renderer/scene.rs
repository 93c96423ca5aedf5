//! Painter-based scene: Earth, satellite markers, paths and ground tracks
//!
//! The scene is the render sink the track builder writes into. It keeps one
//! entity per tracked object and draws either a flat overhead map or an
//! orbitable globe.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use super::earth::{
    generate_earth_sphere, globe_mesh, overhead_to_screen, split_at_antimeridian, EarthVertex,
};
use super::{geodetic_to_world, load_texture, Camera, RenderSink, ViewMode};
use crate::data::{ObjectId, Regime};
use crate::propagation::{GeodeticPosition, LayerVisibility, PathSample};

/// Samples kept per entity position stream
const MAX_STREAM_SAMPLES: usize = 64;

const SPHERE_SEGMENTS: u32 = 72;
const SPHERE_RINGS: u32 = 36;

/// The visualization surface could not be set up
#[derive(Debug, Clone, PartialEq)]
pub enum RenderInitError {
    Texture { path: PathBuf, message: String },
}

impl std::fmt::Display for RenderInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Texture { path, message } => {
                write!(f, "Cannot load earth texture {:?}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for RenderInitError {}

/// Everything drawn for one tracked object
#[derive(Debug)]
struct Entity {
    label: String,
    regime: Regime,
    stream: VecDeque<(satkit::Instant, GeodeticPosition)>,
    path: Vec<GeodeticPosition>,
}

impl Entity {
    fn latest(&self) -> Option<&GeodeticPosition> {
        self.stream.back().map(|(_, p)| p)
    }
}

pub struct Scene {
    entities: HashMap<ObjectId, Entity>,
    view_mode: ViewMode,
    camera: Camera,
    earth_texture: Option<egui::TextureHandle>,
    sphere_vertices: Vec<EarthVertex>,
    sphere_indices: Vec<u32>,
}

impl Scene {
    /// Build the scene, uploading the earth texture when one is configured
    pub fn new(ctx: &egui::Context, texture_path: Option<&Path>) -> Result<Self, RenderInitError> {
        let earth_texture = match texture_path {
            Some(path) => {
                let image = load_texture(path).map_err(|e| RenderInitError::Texture {
                    path: path.to_path_buf(),
                    message: format!("{:#}", e),
                })?;
                Some(ctx.load_texture("earth", image, egui::TextureOptions::LINEAR))
            }
            None => None,
        };

        let (sphere_vertices, sphere_indices) = generate_earth_sphere(SPHERE_SEGMENTS, SPHERE_RINGS);
        log::info!(
            "Scene initialized ({} earth vertices, texture: {})",
            sphere_vertices.len(),
            earth_texture.is_some()
        );

        Ok(Self {
            entities: HashMap::new(),
            view_mode: ViewMode::default(),
            camera: Camera::default(),
            earth_texture,
            sphere_vertices,
            sphere_indices,
        })
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Paint the scene into the remaining space of `ui`
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        layers: &LayerVisibility,
        ground_tracks: &[Vec<GeodeticPosition>],
    ) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        painter.rect_filled(response.rect, 0.0, egui::Color32::from_rgb(5, 5, 15));

        match self.view_mode {
            ViewMode::Globe => {
                self.handle_camera_input(ui, &response);
                self.paint_globe(&painter, response.rect, layers, ground_tracks);
            }
            ViewMode::Overhead => {
                let map_rect = fit_map_rect(response.rect);
                self.paint_overhead(&painter, map_rect, layers, ground_tracks);
            }
        }

        draw_legend(&painter, response.rect);
    }

    fn handle_camera_input(&mut self, ui: &egui::Ui, response: &egui::Response) {
        if response.dragged() {
            let delta = response.drag_delta();
            self.camera.orbit(delta.x, delta.y);
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                self.camera.zoom(scroll * 0.01);
            }
        }
    }

    fn paint_globe(
        &self,
        painter: &egui::Painter,
        rect: egui::Rect,
        layers: &LayerVisibility,
        ground_tracks: &[Vec<GeodeticPosition>],
    ) {
        let texture = self.earth_texture.as_ref().map(|t| t.id());
        let mesh = globe_mesh(
            &self.sphere_vertices,
            &self.sphere_indices,
            &self.camera,
            rect,
            texture,
        );
        painter.add(egui::Shape::mesh(mesh));

        let project = |p: &GeodeticPosition| {
            let world = geodetic_to_world(p);
            if self.camera.is_occluded(world) {
                None
            } else {
                self.camera.project(world, rect)
            }
        };

        for track in ground_tracks {
            let points: Vec<Option<egui::Pos2>> = track.iter().map(project).collect();
            draw_segments(painter, &points, ground_track_stroke());
        }

        for entity in self.entities.values() {
            if !entity.path.is_empty() {
                let points: Vec<Option<egui::Pos2>> = entity.path.iter().map(project).collect();
                draw_segments(painter, &points, path_stroke(entity.regime));
            }
        }

        for entity in self.entities.values() {
            if let Some(pos) = entity.latest().and_then(project) {
                draw_marker(painter, pos, entity, layers.labels);
            }
        }
    }

    fn paint_overhead(
        &self,
        painter: &egui::Painter,
        rect: egui::Rect,
        layers: &LayerVisibility,
        ground_tracks: &[Vec<GeodeticPosition>],
    ) {
        match &self.earth_texture {
            Some(texture) => {
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(texture.id(), rect, uv, egui::Color32::WHITE);
            }
            None => {
                painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(25, 60, 120));
                draw_graticule(painter, rect);
            }
        }

        for track in ground_tracks {
            for run in split_at_antimeridian(track) {
                let points = run.iter().map(|p| overhead_to_screen(p, rect)).collect();
                painter.add(egui::Shape::line(points, ground_track_stroke()));
            }
        }

        for entity in self.entities.values() {
            for run in split_at_antimeridian(&entity.path) {
                let points = run.iter().map(|p| overhead_to_screen(p, rect)).collect();
                painter.add(egui::Shape::line(points, path_stroke(entity.regime)));
            }
        }

        for entity in self.entities.values() {
            if let Some(position) = entity.latest() {
                draw_marker(painter, overhead_to_screen(position, rect), entity, layers.labels);
            }
        }
    }
}

impl RenderSink for Scene {
    fn append_position(
        &mut self,
        id: &ObjectId,
        label: &str,
        regime: Regime,
        time: &satkit::Instant,
        position: GeodeticPosition,
    ) {
        let entity = self.entities.entry(id.clone()).or_insert_with(|| Entity {
            label: label.to_string(),
            regime,
            stream: VecDeque::with_capacity(MAX_STREAM_SAMPLES),
            path: Vec::new(),
        });
        if entity.stream.len() == MAX_STREAM_SAMPLES {
            entity.stream.pop_front();
        }
        entity.stream.push_back((*time, position));
    }

    fn set_path(&mut self, id: &ObjectId, samples: &[PathSample]) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.path = samples.iter().map(|s| s.position).collect();
        }
    }

    fn clear_path(&mut self, id: &ObjectId) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.path.clear();
        }
    }

    fn release(&mut self, id: &ObjectId) {
        self.entities.remove(id);
    }

    fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }
}

/// Largest 2:1 rectangle centered in `rect`
fn fit_map_rect(rect: egui::Rect) -> egui::Rect {
    let width = rect.width().min(rect.height() * 2.0);
    egui::Rect::from_center_size(rect.center(), egui::vec2(width, width / 2.0))
}

fn path_stroke(regime: Regime) -> egui::Stroke {
    let [r, g, b] = regime.color();
    egui::Stroke::new(1.5, egui::Color32::from_rgba_unmultiplied(r, g, b, 160))
}

fn ground_track_stroke() -> egui::Stroke {
    egui::Stroke::new(1.0, egui::Color32::from_rgba_unmultiplied(255, 255, 255, 110))
}

/// Line segments between consecutive visible points
fn draw_segments(painter: &egui::Painter, points: &[Option<egui::Pos2>], stroke: egui::Stroke) {
    for window in points.windows(2) {
        if let (Some(a), Some(b)) = (window[0], window[1]) {
            painter.line_segment([a, b], stroke);
        }
    }
}

fn draw_marker(painter: &egui::Painter, pos: egui::Pos2, entity: &Entity, show_label: bool) {
    painter.circle_filled(pos, 3.0, entity.regime.color32());
    if show_label {
        painter.text(
            pos + egui::vec2(6.0, -6.0),
            egui::Align2::LEFT_BOTTOM,
            &entity.label,
            egui::FontId::proportional(11.0),
            egui::Color32::from_rgb(220, 220, 220),
        );
    }
}

fn draw_graticule(painter: &egui::Painter, rect: egui::Rect) {
    let stroke = egui::Stroke::new(0.5, egui::Color32::from_rgba_unmultiplied(150, 180, 255, 60));
    for i in 0..=12 {
        let x = rect.left() + rect.width() * i as f32 / 12.0;
        painter.line_segment([egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())], stroke);
    }
    for i in 0..=6 {
        let y = rect.top() + rect.height() * i as f32 / 6.0;
        painter.line_segment([egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)], stroke);
    }
}

fn draw_legend(painter: &egui::Painter, rect: egui::Rect) {
    let legend_x = rect.right() - 90.0;
    let legend_y = rect.top() + 20.0;

    for (i, regime) in Regime::ALL.iter().enumerate() {
        let y = legend_y + i as f32 * 18.0;
        painter.circle_filled(egui::pos2(legend_x, y), 5.0, regime.color32());
        painter.text(
            egui::pos2(legend_x + 12.0, y),
            egui::Align2::LEFT_CENTER,
            regime.label(),
            egui::FontId::proportional(11.0),
            egui::Color32::from_rgb(180, 180, 180),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fallback_records;

    fn position(lon: f64) -> GeodeticPosition {
        GeodeticPosition {
            longitude_deg: lon,
            latitude_deg: 10.0,
            height_m: 400_000.0,
        }
    }

    fn time(seconds: f64) -> satkit::Instant {
        satkit::Instant::from_datetime(2026, 1, 29, 12, 0, 0.0).unwrap()
            + satkit::Duration::from_seconds(seconds)
    }

    fn scene() -> Scene {
        Scene::new(&egui::Context::default(), None).unwrap()
    }

    #[test]
    fn test_stream_is_bounded() {
        let mut scene = scene();
        let id = fallback_records()[0].id();
        for i in 0..(MAX_STREAM_SAMPLES + 10) {
            scene.append_position(&id, "ISS", Regime::Leo, &time(i as f64), position(i as f64));
        }
        let entity = &scene.entities[&id];
        assert_eq!(entity.stream.len(), MAX_STREAM_SAMPLES);
        assert_eq!(entity.latest().unwrap().longitude_deg, (MAX_STREAM_SAMPLES + 9) as f64);
    }

    #[test]
    fn test_release_drops_entity_and_path() {
        let mut scene = scene();
        let id = fallback_records()[0].id();
        scene.append_position(&id, "ISS", Regime::Leo, &time(0.0), position(0.0));
        scene.set_path(
            &id,
            &[PathSample {
                time: time(0.0),
                position: position(0.0),
            }],
        );
        assert_eq!(scene.entities[&id].path.len(), 1);

        scene.clear_path(&id);
        assert!(scene.entities[&id].path.is_empty());

        scene.release(&id);
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_path_for_unknown_entity_is_ignored() {
        let mut scene = scene();
        let id = fallback_records()[0].id();
        scene.set_path(&id, &[]);
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn test_view_mode_switch() {
        let mut scene = scene();
        assert_eq!(scene.view_mode(), ViewMode::Globe);
        scene.set_view_mode(ViewMode::Overhead);
        assert_eq!(scene.view_mode(), ViewMode::Overhead);
    }

    #[test]
    fn test_missing_texture_fails_init() {
        let result = Scene::new(&egui::Context::default(), Some(Path::new("missing/earth.jpg")));
        assert!(matches!(result, Err(RenderInitError::Texture { .. })));
    }

    #[test]
    fn test_fit_map_rect_keeps_aspect() {
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(1000.0, 300.0));
        let map = fit_map_rect(rect);
        assert_eq!(map.width(), 600.0);
        assert_eq!(map.height(), 300.0);
        assert_eq!(map.center(), rect.center());
    }
}
