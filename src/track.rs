use glam::Vec3;

use crate::config::*;

/// Immutable Catmull-Rom spline through the course sample points, shared
/// read-only by the physics ribbon, the obstacle motion and the renderer.
pub struct TrackCurve {
    points: Vec<Vec3>,
}

/// One oriented slab of the physics ribbon.
pub struct TrackSegment {
    pub center: Vec3,
    pub yaw: f32,
    pub half_length: f32,
}

impl TrackCurve {
    /// The course: two gentle S-curves from x = -25 to x = 25 at constant height.
    pub fn course() -> Self {
        let mut points = Vec::with_capacity(TRACK_SEGMENTS + 1);
        for i in 0..=TRACK_SEGMENTS {
            let t = i as f32 / TRACK_SEGMENTS as f32;
            let x = t * TRACK_LENGTH_X - TRACK_LENGTH_X / 2.0;
            let z = (t * std::f32::consts::TAU).sin() * TRACK_WAVE_AMPLITUDE;
            points.push(Vec3::new(x, TRACK_Y, z));
        }
        Self::new(points)
    }

    pub fn new(points: Vec<Vec3>) -> Self {
        assert!(points.len() >= 2, "curve needs at least two points");
        Self { points }
    }

    /// Position on the curve at parameter t in [0, 1], clamped outside.
    pub fn point(&self, t: f32) -> Vec3 {
        let (p0, p1, p2, p3, u) = self.control_points(t);
        let u2 = u * u;
        let u3 = u2 * u;
        0.5 * ((2.0 * p1)
            + (p2 - p0) * u
            + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u2
            + (3.0 * p1 - p0 - 3.0 * p2 + p3) * u3)
    }

    /// Unit tangent at parameter t, pointing down-track (increasing t).
    pub fn tangent(&self, t: f32) -> Vec3 {
        let (p0, p1, p2, p3, u) = self.control_points(t);
        let u2 = u * u;
        let d = 0.5
            * ((p2 - p0)
                + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * (2.0 * u)
                + (3.0 * p1 - p0 - 3.0 * p2 + p3) * (3.0 * u2));
        d.normalize_or_zero()
    }

    /// Horizontal unit vector perpendicular to the tangent (to the track's side).
    pub fn perpendicular(&self, t: f32) -> Vec3 {
        let tangent = self.tangent(t);
        Vec3::new(-tangent.z, 0.0, tangent.x).normalize_or_zero()
    }

    /// Oriented slabs approximating the ribbon for the physics engine.
    pub fn collider_segments(&self) -> Vec<TrackSegment> {
        let n = self.points.len() - 1;
        let mut segments = Vec::with_capacity(n);
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[i + 1];
            let mid = (a + b) / 2.0;
            let chord = b - a;
            // Slight overlap so the car cannot catch a seam between slabs.
            let half_length = chord.length() / 2.0 + 0.05;
            let yaw = (-chord.z).atan2(chord.x);
            segments.push(TrackSegment {
                center: mid,
                yaw,
                half_length,
            });
        }
        segments
    }

    /// Flat triangle ribbon of the drivable surface, as (position, normal) pairs.
    pub fn ribbon_mesh(&self) -> (Vec<(Vec3, Vec3)>, Vec<u32>) {
        let n = self.points.len();
        let mut vertices = Vec::with_capacity(n * 2);
        let mut indices = Vec::with_capacity((n - 1) * 6);
        let top = TRACK_Y + TRACK_HALF_THICKNESS;
        for i in 0..n {
            let t = i as f32 / (n - 1) as f32;
            let p = self.points[i];
            let side = self.perpendicular(t) * TRACK_HALF_WIDTH;
            let left = Vec3::new(p.x - side.x, top, p.z - side.z);
            let right = Vec3::new(p.x + side.x, top, p.z + side.z);
            vertices.push((left, Vec3::Y));
            vertices.push((right, Vec3::Y));
        }
        for i in 0..(n - 1) as u32 {
            let base = i * 2;
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
        }
        (vertices, indices)
    }

    fn control_points(&self, t: f32) -> (Vec3, Vec3, Vec3, Vec3, f32) {
        let n = self.points.len();
        let scaled = t.clamp(0.0, 1.0) * (n - 1) as f32;
        let i = (scaled.floor() as usize).min(n - 2);
        let u = scaled - i as f32;

        let p1 = self.points[i];
        let p2 = self.points[i + 1];
        // Open curve: reflect the end points for the outer controls.
        let p0 = if i == 0 {
            2.0 * p1 - p2
        } else {
            self.points[i - 1]
        };
        let p3 = if i + 2 >= n {
            2.0 * p2 - p1
        } else {
            self.points[i + 2]
        };
        (p0, p1, p2, p3, u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn passes_through_sample_points() {
        let curve = TrackCurve::course();
        for i in [0, 25, 50, 75, 100] {
            let t = i as f32 / TRACK_SEGMENTS as f32;
            let expected = Vec3::new(
                t * TRACK_LENGTH_X - 25.0,
                TRACK_Y,
                (t * std::f32::consts::TAU).sin() * TRACK_WAVE_AMPLITUDE,
            );
            let got = curve.point(t);
            assert!(
                (got - expected).length() < 1e-3,
                "t={t}: {got:?} vs {expected:?}"
            );
        }
    }

    #[test]
    fn clamps_parameter_outside_range() {
        let curve = TrackCurve::course();
        assert!((curve.point(-0.5) - curve.point(0.0)).length() < EPS);
        assert!((curve.point(1.5) - curve.point(1.0)).length() < EPS);
    }

    #[test]
    fn tangent_points_down_track() {
        let curve = TrackCurve::course();
        for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let tangent = curve.tangent(t);
            assert!(tangent.x > 0.0, "t={t}: tangent {tangent:?}");
            assert!((tangent.length() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn perpendicular_is_horizontal_and_orthogonal() {
        let curve = TrackCurve::course();
        for t in [0.1, 0.4, 0.8] {
            let perp = curve.perpendicular(t);
            assert!(perp.y.abs() < EPS);
            assert!(perp.dot(curve.tangent(t)).abs() < 1e-3);
        }
    }

    #[test]
    fn collider_segments_cover_the_course() {
        let curve = TrackCurve::course();
        let segments = curve.collider_segments();
        assert_eq!(segments.len(), TRACK_SEGMENTS);
        assert!(segments.first().unwrap().center.x < -24.0);
        assert!(segments.last().unwrap().center.x > 24.0);
        for seg in &segments {
            assert!(seg.half_length > 0.0);
        }
    }
}
