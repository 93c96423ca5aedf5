//! Camera controller for the globe view

use glam::{Mat4, Vec3, Vec4};

use crate::propagation::{GeodeticPosition, EARTH_RADIUS_KM};

/// Orbital camera that rotates around the Earth's center. World units are
/// Earth radii.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Distance from the Earth's center
    pub distance: f32,
    /// Azimuth angle (rotation around Y axis) in radians
    pub azimuth: f32,
    /// Elevation angle (rotation above/below XZ plane) in radians
    pub elevation: f32,
    /// Field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            distance: 4.0, // About 4 Earth radii out
            azimuth: 0.0,
            elevation: 0.3, // Slightly above equator
            fov: 45.0_f32.to_radians(),
            near: 0.01,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Get camera position in world space
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.elevation.cos() * self.azimuth.sin();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.elevation.cos() * self.azimuth.cos();
        Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        self.projection_matrix(aspect_ratio) * self.view_matrix()
    }

    /// Orbit the camera (mouse drag)
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        self.azimuth -= delta_x * 0.01;
        self.elevation = (self.elevation + delta_y * 0.01).clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
    }

    /// Zoom the camera (mouse wheel)
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta * 0.1)).clamp(1.5, 50.0);
    }

    /// Screen position of a world point inside `rect`, or `None` when it is
    /// behind the camera or outside the depth range
    pub fn project(&self, world: Vec3, rect: egui::Rect) -> Option<egui::Pos2> {
        let aspect = rect.width() / rect.height().max(1.0);
        let clip = self.view_projection_matrix(aspect) * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = Vec3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w);
        if !(ndc.z > 0.0 && ndc.z < 1.0) {
            return None;
        }
        let center = rect.center();
        Some(egui::pos2(
            center.x + ndc.x * rect.width() * 0.5,
            center.y - ndc.y * rect.height() * 0.5,
        ))
    }

    /// True when the Earth blocks the line of sight to `world`
    pub fn is_occluded(&self, world: Vec3) -> bool {
        is_occluded_by_earth(self.position(), world)
    }
}

/// World-space point for a geodetic position on a spherical Earth of radius 1.
/// Longitude 0 faces +Z, north is +Y.
pub fn geodetic_to_world(position: &GeodeticPosition) -> Vec3 {
    let r = 1.0 + (position.height_m / 1000.0 / EARTH_RADIUS_KM) as f32;
    let lat = (position.latitude_deg as f32).to_radians();
    let lon = (position.longitude_deg as f32).to_radians();
    Vec3::new(r * lat.cos() * lon.sin(), r * lat.sin(), r * lat.cos() * lon.cos())
}

/// Segment from the camera to the point crosses the unit sphere
pub fn is_occluded_by_earth(camera_pos: Vec3, point: Vec3) -> bool {
    if camera_pos.length_squared() <= 1.0 {
        return false;
    }
    let dir = point - camera_pos;
    let a = dir.dot(dir);
    if a <= 0.0 {
        return false;
    }

    let b = 2.0 * camera_pos.dot(dir);
    let c = camera_pos.dot(camera_pos) - 1.0;
    let disc = b * b - 4.0 * a * c;
    if disc <= 0.0 {
        return false;
    }

    let sqrt_disc = disc.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    // Points on the surface touch the sphere at t = 1
    let (tmin, _) = if t1 < t2 { (t1, t2) } else { (t2, t1) };

    tmin >= 0.0 && tmin < 1.0 - 1.0e-4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo(lon: f64, lat: f64, height_m: f64) -> GeodeticPosition {
        GeodeticPosition {
            longitude_deg: lon,
            latitude_deg: lat,
            height_m,
        }
    }

    #[test]
    fn test_geodetic_to_world_axes() {
        let p = geodetic_to_world(&geo(0.0, 0.0, 0.0));
        assert!((p - Vec3::Z).length() < 1e-6);

        let north = geodetic_to_world(&geo(0.0, 90.0, 0.0));
        assert!((north - Vec3::Y).length() < 1e-6);

        let raised = geodetic_to_world(&geo(90.0, 0.0, EARTH_RADIUS_KM * 1000.0));
        assert!((raised - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_far_side_is_occluded() {
        let camera = Camera {
            elevation: 0.0,
            ..Camera::default()
        };
        let near_side = geodetic_to_world(&geo(0.0, 0.0, 400_000.0));
        let far_side = geodetic_to_world(&geo(180.0, 0.0, 400_000.0));
        assert!(!camera.is_occluded(near_side));
        assert!(camera.is_occluded(far_side));
    }

    #[test]
    fn test_center_projects_to_rect_center() {
        let camera = Camera::default();
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0));
        let center = camera.project(Vec3::ZERO, rect).unwrap();
        assert!((center.x - 400.0).abs() < 1e-3);
        assert!((center.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::default();
        for _ in 0..100 {
            camera.zoom(5.0);
        }
        assert!(camera.distance >= 1.5);
    }
}
