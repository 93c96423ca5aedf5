//! Tracked objects, trajectory paths and ground tracks

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{GeodeticPosition, PropagationHandle};
use crate::data::{ObjectId, OrbitalElementRecord};
use crate::renderer::{RenderSink, ViewMode};

/// Symmetric window for trajectory paths: `steps_each_side` steps before and
/// after the current time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathWindow {
    pub steps_each_side: u32,
    pub step_seconds: f64,
}

impl Default for PathWindow {
    fn default() -> Self {
        Self {
            steps_each_side: 45,
            step_seconds: 60.0,
        }
    }
}

/// Forward-biased window for ground tracks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundTrackWindow {
    pub behind_seconds: f64,
    pub ahead_seconds: f64,
    pub step_seconds: f64,
}

impl Default for GroundTrackWindow {
    fn default() -> Self {
        Self {
            behind_seconds: 600.0,
            ahead_seconds: 5400.0,
            step_seconds: 60.0,
        }
    }
}

/// Which optional layers are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerVisibility {
    pub labels: bool,
    pub orbits: bool,
    pub ground_tracks: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            labels: true,
            orbits: false,
            ground_tracks: false,
        }
    }
}

/// One point of a trajectory path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub time: satkit::Instant,
    pub position: GeodeticPosition,
}

/// Trajectory path around `center`. Instants that fail to propagate are skipped.
pub fn path_window(
    handle: &PropagationHandle,
    center: &satkit::Instant,
    window: &PathWindow,
) -> Vec<PathSample> {
    let steps = window.steps_each_side as i64;
    let mut samples = Vec::with_capacity((2 * steps + 1) as usize);

    for i in -steps..=steps {
        let time = *center + satkit::Duration::from_seconds(window.step_seconds * i as f64);
        match handle.position_at(&time) {
            Ok(position) => samples.push(PathSample { time, position }),
            Err(e) => log::trace!("Skipping path sample: {}", e),
        }
    }

    samples
}

/// Ground track from `behind_seconds` before to `ahead_seconds` after `center`
pub fn ground_track_window(
    handle: &PropagationHandle,
    center: &satkit::Instant,
    window: &GroundTrackWindow,
) -> Vec<GeodeticPosition> {
    if window.step_seconds <= 0.0 {
        return Vec::new();
    }
    let behind = (window.behind_seconds.max(0.0) / window.step_seconds).floor() as i64;
    let ahead = (window.ahead_seconds.max(0.0) / window.step_seconds).floor() as i64;

    (-behind..=ahead)
        .filter_map(|i| {
            let time = *center + satkit::Duration::from_seconds(window.step_seconds * i as f64);
            handle
                .position_at(&time)
                .map_err(|e| log::trace!("Skipping ground track sample: {}", e))
                .ok()
        })
        .map(|p| GeodeticPosition { height_m: 0.0, ..p })
        .collect()
}

/// An object under tracking and its latest samples
pub struct TrackedObject {
    id: ObjectId,
    record: OrbitalElementRecord,
    handle: PropagationHandle,
    current: Option<GeodeticPosition>,
    path: Vec<PathSample>,
    path_center: Option<satkit::Instant>,
}

impl TrackedObject {
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn record(&self) -> &OrbitalElementRecord {
        &self.record
    }

    pub fn handle(&self) -> &PropagationHandle {
        &self.handle
    }

    /// Latest good position; retained across failed instants
    pub fn current(&self) -> Option<GeodeticPosition> {
        self.current
    }

    pub fn path(&self) -> &[PathSample] {
        &self.path
    }
}

/// Owns the tracked objects and is the only writer to the render sink
pub struct TrackBuilder {
    objects: BTreeMap<ObjectId, TrackedObject>,
    path_window: PathWindow,
    ground_track_window: GroundTrackWindow,
}

impl TrackBuilder {
    pub fn new(path_window: PathWindow, ground_track_window: GroundTrackWindow) -> Self {
        Self {
            objects: BTreeMap::new(),
            path_window,
            ground_track_window,
        }
    }

    /// Sync tracked objects with `fleet`. New objects get a propagation
    /// handle; objects no longer present are released from the sink. An
    /// object whose element set changed is rebuilt and starts over.
    pub fn rebuild(&mut self, fleet: &[OrbitalElementRecord], sink: &mut dyn RenderSink) {
        let wanted: BTreeSet<ObjectId> = fleet.iter().map(|r| r.id()).collect();

        let removed: Vec<ObjectId> = self
            .objects
            .keys()
            .filter(|id| !wanted.contains(*id))
            .cloned()
            .collect();
        for id in &removed {
            self.objects.remove(id);
            sink.release(id);
        }

        let mut added = 0;
        let mut updated = 0;
        for record in fleet {
            let id = record.id();
            if let Some(existing) = self.objects.get(&id) {
                if existing.record == *record {
                    continue;
                }
                // Newer element set for a tracked object; old samples no longer apply
                sink.release(&id);
                match PropagationHandle::build(record) {
                    Ok(handle) => {
                        if let Some(object) = self.objects.get_mut(&id) {
                            object.record = record.clone();
                            object.handle = handle;
                            object.current = None;
                            object.path.clear();
                            object.path_center = None;
                        }
                        updated += 1;
                    }
                    Err(e) => {
                        log::warn!("Cannot track {} ({}): {}", record.name(), id, e);
                        self.objects.remove(&id);
                    }
                }
                continue;
            }
            match PropagationHandle::build(record) {
                Ok(handle) => {
                    self.objects.insert(
                        id.clone(),
                        TrackedObject {
                            id,
                            record: record.clone(),
                            handle,
                            current: None,
                            path: Vec::new(),
                            path_center: None,
                        },
                    );
                    added += 1;
                }
                Err(e) => log::warn!("Cannot track {} ({}): {}", record.name(), id, e),
            }
        }

        log::info!(
            "Track rebuild: {} added, {} updated, {} removed, {} tracked",
            added,
            updated,
            removed.len(),
            self.objects.len()
        );
    }

    /// Recompute current samples and, if the orbit layer is on, paths.
    /// No path is drawn for an object without a current sample. Turning the
    /// orbit layer off clears every path.
    pub fn refresh_samples(
        &mut self,
        time: &satkit::Instant,
        layers: &LayerVisibility,
        sink: &mut dyn RenderSink,
    ) {
        for object in self.objects.values_mut() {
            match object.handle.position_at(time) {
                Ok(position) => {
                    object.current = Some(position);
                    sink.append_position(
                        &object.id,
                        object.record.name(),
                        object.record.regime(),
                        time,
                        position,
                    );
                }
                Err(e) => log::trace!("{}: keeping previous sample: {}", object.record.name(), e),
            }

            if layers.orbits && object.current.is_some() {
                // Paths move slowly; recompute once the clock has moved a full step
                let stale = match object.path_center {
                    Some(center) => {
                        (*time - center).as_seconds().abs() >= self.path_window.step_seconds
                    }
                    None => true,
                };
                if stale {
                    object.path = path_window(&object.handle, time, &self.path_window);
                    object.path_center = Some(*time);
                    sink.set_path(&object.id, &object.path);
                }
            } else if !layers.orbits && object.path_center.is_some() {
                object.path.clear();
                object.path_center = None;
                sink.clear_path(&object.id);
            }
        }
    }

    /// Ground track for one object, computed on demand
    pub fn ground_track(&self, id: &ObjectId, time: &satkit::Instant) -> Vec<GeodeticPosition> {
        match self.objects.get(id) {
            Some(object) => ground_track_window(&object.handle, time, &self.ground_track_window),
            None => Vec::new(),
        }
    }

    pub fn set_view_mode(&self, mode: ViewMode, sink: &mut dyn RenderSink) {
        log::debug!("View mode: {}", mode.label());
        sink.set_view_mode(mode);
    }

    /// Release every entity; used on teardown
    pub fn release_all(&mut self, sink: &mut dyn RenderSink) {
        for id in self.objects.keys() {
            sink.release(id);
        }
        self.objects.clear();
    }

    pub fn objects(&self) -> impl Iterator<Item = &TrackedObject> {
        self.objects.values()
    }

    pub fn get(&self, id: &ObjectId) -> Option<&TrackedObject> {
        self.objects.get(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
