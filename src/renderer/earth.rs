//! Earth geometry - sphere mesh for the globe, equirectangular map for the overhead view

use glam::Vec3;

use super::{geodetic_to_world, Camera};
use crate::propagation::GeodeticPosition;

/// Vertex for Earth mesh
#[derive(Clone, Copy, Debug)]
pub struct EarthVertex {
    pub position: Vec3,
    pub uv: [f32; 2],
}

/// Generate a UV sphere mesh for Earth on the latitude/longitude grid
/// Returns (vertices, indices)
pub fn generate_earth_sphere(segments: u32, rings: u32) -> (Vec<EarthVertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let latitude_deg = 90.0 - 180.0 * v as f64;

        for seg in 0..=segments {
            let u = seg as f32 / segments as f32;
            let longitude_deg = -180.0 + 360.0 * u as f64;

            let position = geodetic_to_world(&GeodeticPosition {
                longitude_deg,
                latitude_deg,
                height_m: 0.0,
            });

            // UV mapping (equirectangular)
            vertices.push(EarthVertex {
                position,
                uv: [u, v],
            });
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let current = ring * (segments + 1) + seg;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    (vertices, indices)
}

/// Project the front-facing half of the sphere into a paintable mesh
pub fn globe_mesh(
    vertices: &[EarthVertex],
    indices: &[u32],
    camera: &Camera,
    rect: egui::Rect,
    texture: Option<egui::TextureId>,
) -> egui::Mesh {
    let mut mesh = match texture {
        Some(id) => egui::Mesh::with_texture(id),
        None => egui::Mesh::default(),
    };
    let camera_pos = camera.position();
    let color = if texture.is_some() {
        egui::Color32::WHITE
    } else {
        egui::Color32::from_rgb(25, 60, 120)
    };

    let projected: Vec<Option<egui::Pos2>> = vertices
        .iter()
        .map(|v| camera.project(v.position, rect))
        .collect();

    for triangle in indices.chunks_exact(3) {
        let corners = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let centroid = corners
            .iter()
            .fold(Vec3::ZERO, |acc, &i| acc + vertices[i].position)
            / 3.0;
        if centroid.dot(camera_pos - centroid) <= 0.0 {
            continue;
        }

        let screen: Option<Vec<egui::Pos2>> = corners.iter().map(|&i| projected[i]).collect();
        let Some(screen) = screen else {
            continue;
        };

        let base = mesh.vertices.len() as u32;
        for (&i, pos) in corners.iter().zip(screen) {
            let uv = if texture.is_some() {
                egui::pos2(vertices[i].uv[0], vertices[i].uv[1])
            } else {
                egui::epaint::WHITE_UV
            };
            mesh.vertices.push(egui::epaint::Vertex { pos, uv, color });
        }
        mesh.add_triangle(base, base + 1, base + 2);
    }

    mesh
}

/// Screen position of a geodetic position on the equirectangular map in `rect`
pub fn overhead_to_screen(position: &GeodeticPosition, rect: egui::Rect) -> egui::Pos2 {
    let x = (position.longitude_deg + 180.0) / 360.0;
    let y = (90.0 - position.latitude_deg) / 180.0;
    egui::pos2(
        rect.left() + x as f32 * rect.width(),
        rect.top() + y as f32 * rect.height(),
    )
}

/// Split a polyline wherever consecutive points jump across the antimeridian
pub fn split_at_antimeridian(points: &[GeodeticPosition]) -> Vec<Vec<GeodeticPosition>> {
    let mut runs: Vec<Vec<GeodeticPosition>> = Vec::new();
    let mut current: Vec<GeodeticPosition> = Vec::new();

    for point in points {
        if let Some(last) = current.last() {
            if (point.longitude_deg - last.longitude_deg).abs() > 180.0 {
                runs.push(std::mem::take(&mut current));
            }
        }
        current.push(*point);
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs.retain(|run| run.len() > 1);
    runs
}
