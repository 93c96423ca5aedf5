//! Time controls for simulation playback, layer toggles and view mode

use egui::Ui;

use crate::propagation::{ClockState, LayerVisibility, SimulationClock, MAX_RATE, MIN_RATE};
use crate::renderer::ViewMode;

/// Requested change to the clock or the view
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeAction {
    Play,
    Pause,
    SetRate(f64),
    ResetToNow,
    SetViewMode(ViewMode),
}

/// Time control state
#[derive(Clone)]
pub struct TimeControls {
    /// Rate shown on the slider
    pub rate: f64,
    /// Available speed presets
    pub speed_presets: Vec<f64>,
    pub layers: LayerVisibility,
    pub view_mode: ViewMode,
}

impl Default for TimeControls {
    fn default() -> Self {
        Self {
            rate: 1.0,
            speed_presets: vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0],
            layers: LayerVisibility::default(),
            view_mode: ViewMode::default(),
        }
    }
}

impl TimeControls {
    pub fn new(rate: f64, layers: LayerVisibility) -> Self {
        Self {
            rate: clamp_rate(rate),
            layers,
            ..Self::default()
        }
    }

    /// Play/pause, rate and reset controls. Returns the actions the user took
    /// this frame; the caller applies them to the clock.
    pub fn show_top_bar(&mut self, ui: &mut Ui, clock: &SimulationClock) -> Vec<TimeAction> {
        let mut actions = Vec::new();

        ui.horizontal(|ui| {
            let running = clock.state() == ClockState::Running;
            let play_text = if running { "⏸" } else { "▶" };
            if ui.button(play_text).clicked() {
                actions.push(if running {
                    TimeAction::Pause
                } else {
                    TimeAction::Play
                });
            }

            if ui.button("⏪").clicked() {
                actions.push(TimeAction::SetRate(self.step_time_scale(-1)));
            }

            if ui.button("⏩").clicked() {
                actions.push(TimeAction::SetRate(self.step_time_scale(1)));
            }

            ui.separator();
            let response = ui.add(
                egui::Slider::new(&mut self.rate, MIN_RATE..=MAX_RATE)
                    .logarithmic(true)
                    .text("Speed")
                    .custom_formatter(|v, _| format_speed(v)),
            );
            if response.changed() {
                self.rate = clamp_rate(self.rate);
                actions.push(TimeAction::SetRate(self.rate));
            }

            if ui.button("Now").on_hover_text("Reset to real time").clicked() {
                actions.push(TimeAction::ResetToNow);
            }

            ui.separator();
            ui.label(format!("Time: {}", clock.format_time()));
        });

        actions
    }

    /// Layer toggles and the view-mode selector
    pub fn show_view_settings(&mut self, ui: &mut Ui) -> Option<TimeAction> {
        let mut action = None;

        ui.label("Layers");
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.layers.labels, "Labels");
            ui.checkbox(&mut self.layers.orbits, "Orbits");
            ui.checkbox(&mut self.layers.ground_tracks, "Ground tracks");
        });

        ui.horizontal(|ui| {
            ui.label("View");
            egui::ComboBox::from_id_salt("view_mode")
                .selected_text(self.view_mode.label())
                .show_ui(ui, |ui| {
                    for mode in ViewMode::ALL {
                        if ui
                            .selectable_value(&mut self.view_mode, mode, mode.label())
                            .clicked()
                        {
                            action = Some(TimeAction::SetViewMode(mode));
                        }
                    }
                });
        });

        action
    }

    fn set_speed(&mut self, speed: f64) {
        self.rate = clamp_rate(speed);
    }

    /// Move to the next preset up or down from the current rate
    fn step_time_scale(&mut self, direction: i32) -> f64 {
        let current = self.rate;
        let next = if direction > 0 {
            self.speed_presets
                .iter()
                .copied()
                .find(|p| *p > current + f64::EPSILON)
        } else {
            self.speed_presets
                .iter()
                .rev()
                .copied()
                .find(|p| *p < current - f64::EPSILON)
        };

        self.set_speed(next.unwrap_or(current));
        self.rate
    }
}

/// Clamp to the range the UI offers; non-finite input falls back to real time
pub fn clamp_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(MIN_RATE, MAX_RATE)
    } else {
        1.0
    }
}

fn format_speed(speed: f64) -> String {
    if speed == 1.0 {
        "1x".to_string()
    } else if speed >= 1.0 {
        format!("{:.1}x", speed)
    } else {
        format!("{:.2}x", speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_time_scale_walks_presets() {
        let mut controls = TimeControls::default();
        assert_eq!(controls.step_time_scale(1), 2.0);
        assert_eq!(controls.step_time_scale(1), 5.0);
        assert_eq!(controls.step_time_scale(1), 10.0);
        // Saturates at the top
        assert_eq!(controls.step_time_scale(1), 10.0);

        controls.rate = 0.3;
        assert_eq!(controls.step_time_scale(-1), 0.25);
        assert_eq!(controls.step_time_scale(-1), 0.1);
        assert_eq!(controls.step_time_scale(-1), 0.1);
    }

    #[test]
    fn test_clamp_rate() {
        assert_eq!(clamp_rate(0.0), MIN_RATE);
        assert_eq!(clamp_rate(-5.0), MIN_RATE);
        assert_eq!(clamp_rate(50.0), MAX_RATE);
        assert_eq!(clamp_rate(3.0), 3.0);
        assert_eq!(clamp_rate(f64::NAN), 1.0);
    }

    #[test]
    fn test_new_clamps_initial_rate() {
        let controls = TimeControls::new(100.0, LayerVisibility::default());
        assert_eq!(controls.rate, MAX_RATE);
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(1.0), "1x");
        assert_eq!(format_speed(2.5), "2.5x");
        assert_eq!(format_speed(0.25), "0.25x");
    }
}
