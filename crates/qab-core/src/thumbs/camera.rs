use std::ops::{Add, Mul, Sub};

/// Multiplier that moves the camera far from the item so nothing clips.
const CAMERA_DISTANCE_FACTOR: f64 = 8.0;

/// Orthographic size relative to the item's bounding diagonal.
const ORTHO_SIZE_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Axis-aligned bounds of everything the spawned item renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: Vec3,
    pub size: Vec3,
}

/// Measurement of a freshly spawned item: its render bounds and the
/// orientation of its root object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnedObject {
    pub bounds: Bounds,
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

/// Orthographic camera pose for one capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub position: Vec3,
    pub look_at: Vec3,
    pub orthographic_size: f64,
}

impl CameraFrame {
    /// Look down at the item from above its front-left corner.
    #[must_use]
    pub fn isometric(object: &SpawnedObject) -> Self {
        let size = object.bounds.size.magnitude();
        let center = object.bounds.center;
        let position = (center - object.forward * size - object.right * size + object.up * size)
            * CAMERA_DISTANCE_FACTOR;

        Self {
            position,
            look_at: center,
            orthographic_size: size * ORTHO_SIZE_FACTOR,
        }
    }

    /// Look straight at the item's front. Better for flat items and effects.
    #[must_use]
    pub fn front(object: &SpawnedObject) -> Self {
        let size = object.bounds.size.magnitude();
        let position = (object.position + object.forward * size) * CAMERA_DISTANCE_FACTOR;

        Self {
            position,
            look_at: object.bounds.center,
            orthographic_size: size * ORTHO_SIZE_FACTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_object() -> SpawnedObject {
        SpawnedObject {
            bounds: Bounds {
                center: Vec3::new(1.0, 2.0, 3.0),
                size: Vec3::new(0.0, 3.0, 4.0),
            },
            position: Vec3::ZERO,
            forward: Vec3::new(0.0, 0.0, 1.0),
            right: Vec3::new(1.0, 0.0, 0.0),
            up: Vec3::new(0.0, 1.0, 0.0),
        }
    }

    #[test]
    fn test_magnitude() {
        assert!((Vec3::new(0.0, 3.0, 4.0).magnitude() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_isometric_frame() {
        let frame = CameraFrame::isometric(&unit_object());

        // center - fwd*5 - right*5 + up*5 = (1-5, 2+5, 3-5) = (-4, 7, -2), times 8
        assert_eq!(frame.position, Vec3::new(-32.0, 56.0, -16.0));
        assert_eq!(frame.look_at, Vec3::new(1.0, 2.0, 3.0));
        assert!((frame.orthographic_size - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_front_frame() {
        let frame = CameraFrame::front(&unit_object());
        assert_eq!(frame.position, Vec3::new(0.0, 0.0, 40.0));
        assert!((frame.orthographic_size - 2.5).abs() < 1e-12);
    }
}
