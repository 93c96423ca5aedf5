//! Interface between the track builder and whatever draws the scene

use crate::data::{ObjectId, Regime};
use crate::propagation::{GeodeticPosition, PathSample};

/// Camera presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Flat map seen from above
    Overhead,
    /// Orbitable globe
    #[default]
    Globe,
}

impl ViewMode {
    pub const ALL: [ViewMode; 2] = [ViewMode::Globe, ViewMode::Overhead];

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Overhead => "Overhead",
            ViewMode::Globe => "3D Globe",
        }
    }
}

/// Receives rendering updates. Only the track builder writes to a sink.
pub trait RenderSink {
    /// Append a time-stamped sample to the object's position stream,
    /// creating the entity on first use
    fn append_position(
        &mut self,
        id: &ObjectId,
        label: &str,
        regime: Regime,
        time: &satkit::Instant,
        position: GeodeticPosition,
    );

    /// Replace the object's trajectory path
    fn set_path(&mut self, id: &ObjectId, samples: &[PathSample]);

    fn clear_path(&mut self, id: &ObjectId);

    /// Drop every artifact held for the object
    fn release(&mut self, id: &ObjectId);

    fn set_view_mode(&mut self, mode: ViewMode);
}

/// Sink used when the visualization surface is unavailable
#[derive(Debug, Default)]
pub struct DetachedSink;

impl RenderSink for DetachedSink {
    fn append_position(
        &mut self,
        _id: &ObjectId,
        _label: &str,
        _regime: Regime,
        _time: &satkit::Instant,
        _position: GeodeticPosition,
    ) {
    }

    fn set_path(&mut self, _id: &ObjectId, _samples: &[PathSample]) {}

    fn clear_path(&mut self, _id: &ObjectId) {}

    fn release(&mut self, _id: &ObjectId) {}

    fn set_view_mode(&mut self, _mode: ViewMode) {}
}
