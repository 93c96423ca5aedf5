//! UI panels for fleet selection, the tracked-object browser and details

use std::collections::BTreeSet;

use egui::{Color32, RichText, Ui};

use crate::data::{mean_motion, FleetSelection, ObjectId, Regime, CATEGORIES};
use crate::propagation::{TrackBuilder, TrackedObject};

/// Change requested from the fleet panel
#[derive(Debug, Clone, PartialEq)]
pub enum FleetAction {
    SetCategories(Vec<String>),
    SetOrbitTypes(Vec<Regime>),
}

/// Category and orbit-type multi-select
#[derive(Default)]
pub struct FleetPanel;

impl FleetPanel {
    pub fn show(&mut self, ui: &mut Ui, fleet: &FleetSelection) -> Vec<FleetAction> {
        let mut actions = Vec::new();
        ui.heading("Fleet");

        ui.label("Categories:");
        let mut categories = fleet.categories().clone();
        let mut categories_changed = false;
        for category in CATEGORIES.iter() {
            categories_changed |= toggle_member(ui, &mut categories, category.key.to_string(), category.label);
        }
        if categories_changed {
            actions.push(FleetAction::SetCategories(categories.into_iter().collect()));
        }

        ui.separator();
        ui.label("Orbit types:");
        let mut orbit_types = fleet.orbit_types().clone();
        let mut types_changed = false;
        ui.horizontal(|ui| {
            for regime in Regime::ALL {
                types_changed |= toggle_member(ui, &mut orbit_types, regime, regime.label());
            }
        });
        if types_changed {
            actions.push(FleetAction::SetOrbitTypes(orbit_types.into_iter().collect()));
        }

        ui.separator();
        if fleet.is_loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Fetching element sets...");
            });
        }
        if let Some(advisory) = fleet.advisory() {
            ui.colored_label(Color32::from_rgb(230, 180, 80), advisory);
        }
        ui.label(format!(
            "Fetched: {} | Visible: {}",
            fleet.all_fetched().len(),
            fleet.visible().len()
        ));

        actions
    }
}

/// Checkbox bound to set membership. Returns true when toggled.
fn toggle_member<T: Ord + Clone>(ui: &mut Ui, set: &mut BTreeSet<T>, value: T, label: &str) -> bool {
    let mut enabled = set.contains(&value);
    let response = ui.checkbox(&mut enabled, label);
    if response.changed() {
        if enabled {
            set.insert(value);
        } else {
            set.remove(&value);
        }
        return true;
    }
    false
}

/// Tracked-object browser panel
#[derive(Default)]
pub struct BrowserPanel;

impl BrowserPanel {
    pub fn show(
        &mut self,
        ui: &mut Ui,
        tracks: &TrackBuilder,
        selected: Option<&ObjectId>,
    ) -> Option<ObjectId> {
        let mut new_selection = None;
        let objects: Vec<&TrackedObject> = tracks.objects().collect();

        ui.heading(format!("Tracked ({})", objects.len()));

        let row_height = ui.text_style_height(&egui::TextStyle::Body) + ui.spacing().item_spacing.y;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show_rows(ui, row_height, objects.len(), |ui, row_range| {
                for row in row_range {
                    let object = objects[row];
                    let record = object.record();
                    let is_selected = selected == Some(object.id());

                    let text = RichText::new(record.name()).color(record.regime().color32());
                    let response = ui.selectable_label(is_selected, text);

                    if response.clicked() {
                        new_selection = Some(object.id().clone());
                    }

                    response.on_hover_ui(|ui| {
                        ui.label(format!("Catalog: {}", object.id()));
                        ui.label(format!("Orbit: {}", record.regime()));
                    });
                }
            });

        new_selection
    }
}

/// Object detail panel
pub struct DetailPanel;

impl DetailPanel {
    pub fn show(ui: &mut Ui, object: &TrackedObject, time: &satkit::Instant) {
        let record = object.record();
        ui.heading(record.name());
        ui.separator();

        egui::Grid::new("detail_grid")
            .num_columns(2)
            .spacing([10.0, 4.0])
            .show(ui, |ui| {
                ui.label("Catalog:");
                ui.label(object.id().as_str());
                ui.end_row();

                ui.label("Orbit:");
                ui.colored_label(record.regime().color32(), record.regime().label());
                ui.end_row();

                if let Some(mm) = mean_motion(record.line2()) {
                    ui.label("Mean motion:");
                    ui.label(format!("{:.4} rev/day", mm));
                    ui.end_row();
                }

                let age_days = (*time - object.handle().epoch()).as_seconds() / 86_400.0;
                ui.label("Element age:");
                if age_days.abs() > 30.0 {
                    ui.colored_label(Color32::from_rgb(200, 100, 100), format!("{:.1} days", age_days));
                } else {
                    ui.label(format!("{:.1} days", age_days));
                }
                ui.end_row();
            });

        ui.separator();
        ui.heading("Current State");
        match object.current() {
            Some(position) => {
                egui::Grid::new("state_grid")
                    .num_columns(2)
                    .spacing([10.0, 4.0])
                    .show(ui, |ui| {
                        ui.label("Latitude:");
                        ui.label(format!("{:.3}°", position.latitude_deg));
                        ui.end_row();

                        ui.label("Longitude:");
                        ui.label(format!("{:.3}°", position.longitude_deg));
                        ui.end_row();

                        ui.label("Altitude:");
                        ui.label(format!("{:.1} km", position.height_m / 1000.0));
                        ui.end_row();

                        if let Ok(state) = object.handle().teme_state_at(time) {
                            ui.label("Speed:");
                            ui.label(format!("{:.2} km/s", state.speed_km_s()));
                            ui.end_row();
                        }
                    });
            }
            None => {
                ui.colored_label(Color32::from_rgb(200, 120, 120), "No valid position");
            }
        }
    }
}
