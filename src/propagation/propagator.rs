//! SGP4 propagation using satkit, with TEME to geodetic conversion

use nalgebra::Vector3;
use satkit::sgp4::sgp4;

use crate::data::OrbitalElementRecord;

/// WGS84 equatorial radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// WGS84 polar radius in kilometers
pub const EARTH_POLAR_RADIUS_KM: f64 = 6356.7523142;

const JD_J2000: f64 = 2_451_545.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
const GEODETIC_ITERATIONS: usize = 20;
const GEODETIC_TOLERANCE_RAD: f64 = 1.0e-12;

/// Position on the WGS84 ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticPosition {
    /// Longitude in degrees, [-180, 180]
    pub longitude_deg: f64,
    /// Geodetic latitude in degrees, [-90, 90]
    pub latitude_deg: f64,
    /// Height above the ellipsoid in meters
    pub height_m: f64,
}

/// Why a position could not be produced
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationFailure {
    /// Element set rejected by the TLE loader
    InvalidElements { message: String },
    /// SGP4 reported an error for this instant
    Sgp4,
    /// Propagation produced NaN or infinite values
    NonFinite,
    /// Position is inside the Earth
    Decayed { radius_km: f64 },
}

impl std::fmt::Display for PropagationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidElements { message } => write!(f, "Invalid element set: {}", message),
            Self::Sgp4 => write!(f, "SGP4 propagation failed"),
            Self::NonFinite => write!(f, "Propagation produced non-finite state"),
            Self::Decayed { radius_km } => {
                write!(f, "Object has decayed (radius {:.1} km)", radius_km)
            }
        }
    }
}

impl std::error::Error for PropagationFailure {}

/// Inertial (TEME) state in km and km/s
#[derive(Debug, Clone, Copy)]
pub struct TemeState {
    pub position_km: Vector3<f64>,
    pub velocity_km_s: Vector3<f64>,
}

impl TemeState {
    /// Speed in km/s
    pub fn speed_km_s(&self) -> f64 {
        self.velocity_km_s.norm()
    }
}

/// Parsed element set ready for repeated propagation
#[derive(Clone)]
pub struct PropagationHandle {
    tle: satkit::TLE,
}

impl PropagationHandle {
    /// Parse the record's element lines. Done once per record.
    pub fn build(record: &OrbitalElementRecord) -> Result<Self, PropagationFailure> {
        match satkit::TLE::load_2line(record.line1(), record.line2()) {
            Ok(tle) => Ok(Self { tle }),
            Err(e) => Err(PropagationFailure::InvalidElements {
                message: e.to_string(),
            }),
        }
    }

    /// Epoch of the element set
    pub fn epoch(&self) -> satkit::Instant {
        self.tle.epoch
    }

    /// TEME position and velocity at `time`
    pub fn teme_state_at(&self, time: &satkit::Instant) -> Result<TemeState, PropagationFailure> {
        // sgp4 mutates the TLE's cached init state, so work on a copy
        let mut tle = self.tle.clone();
        let result = match sgp4(&mut tle, &[*time]) {
            Ok(result) => result,
            Err(_) => return Err(PropagationFailure::Sgp4),
        };

        // satkit reports meters and m/s
        let pos = result.pos.column(0);
        let vel = result.vel.column(0);
        let state = TemeState {
            position_km: Vector3::new(pos[0], pos[1], pos[2]) / 1000.0,
            velocity_km_s: Vector3::new(vel[0], vel[1], vel[2]) / 1000.0,
        };

        if !state.position_km.iter().all(|v| v.is_finite())
            || !state.velocity_km_s.iter().all(|v| v.is_finite())
        {
            return Err(PropagationFailure::NonFinite);
        }

        let radius_km = state.position_km.norm();
        if radius_km < EARTH_RADIUS_KM {
            return Err(PropagationFailure::Decayed { radius_km });
        }

        Ok(state)
    }

    /// Geodetic position at `time`. A failure affects only this instant.
    pub fn position_at(&self, time: &satkit::Instant) -> Result<GeodeticPosition, PropagationFailure> {
        let state = self.teme_state_at(time)?;
        Ok(teme_to_geodetic(&state.position_km, gmst(time)))
    }
}

/// Greenwich mean sidereal time (IAU-82) in radians, [0, 2π)
pub fn gmst(time: &satkit::Instant) -> f64 {
    gmst_from_jd(time.as_jd())
}

/// Greenwich mean sidereal time for a UT1 Julian date
pub fn gmst_from_jd(jd_ut1: f64) -> f64 {
    let t = (jd_ut1 - JD_J2000) / DAYS_PER_JULIAN_CENTURY;
    let seconds = -6.2e-6 * t * t * t
        + 0.093104 * t * t
        + (876_600.0 * 3600.0 + 8_640_184.812866) * t
        + 67_310.54841;
    // 240 seconds of sidereal time per degree
    (seconds / 240.0).to_radians().rem_euclid(std::f64::consts::TAU)
}

/// Convert a TEME position (km) to geodetic coordinates on WGS84
pub fn teme_to_geodetic(position_km: &Vector3<f64>, gmst: f64) -> GeodeticPosition {
    let a = EARTH_RADIUS_KM;
    let f = (EARTH_RADIUS_KM - EARTH_POLAR_RADIUS_KM) / EARTH_RADIUS_KM;
    let e2 = 2.0 * f - f * f;

    let (x, y, z) = (position_km.x, position_km.y, position_km.z);
    let r = (x * x + y * y).sqrt();

    let longitude = y.atan2(x) - gmst;

    let mut latitude = z.atan2(r);
    let mut c = 1.0;
    for _ in 0..GEODETIC_ITERATIONS {
        let previous = latitude;
        let sin_lat = latitude.sin();
        c = 1.0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        latitude = (z + a * c * e2 * sin_lat).atan2(r);
        if (latitude - previous).abs() < GEODETIC_TOLERANCE_RAD {
            break;
        }
    }

    let height_km = if latitude.cos().abs() > 1.0e-10 {
        r / latitude.cos() - a * c
    } else {
        // Over a pole r/cos(lat) is unstable; use the polar form
        z.abs() - EARTH_POLAR_RADIUS_KM
    };

    GeodeticPosition {
        longitude_deg: normalize_longitude_deg(longitude.to_degrees()),
        latitude_deg: latitude.to_degrees(),
        height_m: height_km * 1000.0,
    }
}

/// Wrap a longitude into [-180, 180]
pub fn normalize_longitude_deg(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}
