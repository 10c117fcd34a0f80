//! Camera projection models
//!
//! Every model maps a 3D ray in the camera frame to a pixel (`project`) and a
//! pixel back to a ray (`unproject`). Rays are not necessarily unit length.
//! The X axis points right, Y down and Z forward, matching the pixel frame.
//!
//! Models implemented here:
//! - `LinearCamera`: ideal pinhole, the target of rectification
//! - `Poly3Camera`: radial polynomial distortion (k1, k2, k3)
//! - `FovCamera`: Devernay-Faugeras field-of-view model
//! - `KannalaBrandtCamera`: equidistant fisheye with four coefficients

use nalgebra::{Matrix3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Below this radius the distortion models fall back to their linear limit.
const SMALL_RADIUS: f64 = 1e-10;

/// Newton iterations used to invert the polynomial models
const NEWTON_ITERATIONS: usize = 20;

/// Projection and unprojection capability consumed by the lookup table builder
/// and the bound finders.
pub trait CameraModel: Send + Sync {
    /// Image width in pixels
    fn width(&self) -> usize;

    /// Image height in pixels
    fn height(&self) -> usize;

    /// Project a ray in the camera frame to a continuous pixel coordinate.
    ///
    /// Rays the model cannot image may produce non-finite coordinates.
    fn project(&self, ray: &Vector3<f64>) -> Vector2<f64>;

    /// Back-project a pixel to a ray in the camera frame.
    fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64>;
}

/// Ideal pinhole camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCamera {
    pub width: usize,
    pub height: usize,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl LinearCamera {
    pub fn new(width: usize, height: usize, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
        }
    }

    /// Build from an upper-triangular intrinsics matrix (skew is ignored)
    pub fn from_matrix(width: usize, height: usize, k: &Matrix3<f64>) -> Self {
        Self::new(width, height, k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)])
    }

    /// Intrinsics matrix K
    pub fn k(&self) -> Matrix3<f64> {
        crate::transform::intrinsics_matrix(self.fx, self.fy, self.cx, self.cy)
    }
}

impl CameraModel for LinearCamera {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn project(&self, ray: &Vector3<f64>) -> Vector2<f64> {
        Vector2::new(
            self.fx * ray.x / ray.z + self.cx,
            self.fy * ray.y / ray.z + self.cy,
        )
    }

    #[inline]
    fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64> {
        Vector3::new(
            (pixel.x - self.cx) / self.fx,
            (pixel.y - self.cy) / self.fy,
            1.0,
        )
    }
}

/// Pinhole camera with radial distortion `1 + k1 r^2 + k2 r^4 + k3 r^6`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Poly3Camera {
    pub width: usize,
    pub height: usize,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub k1: f64,
    #[serde(default)]
    pub k2: f64,
    #[serde(default)]
    pub k3: f64,
}

impl Poly3Camera {
    #[inline]
    fn distortion_factor(&self, r2: f64) -> f64 {
        1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3))
    }
}

impl CameraModel for Poly3Camera {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn project(&self, ray: &Vector3<f64>) -> Vector2<f64> {
        let mx = ray.x / ray.z;
        let my = ray.y / ray.z;
        let d = self.distortion_factor(mx * mx + my * my);
        Vector2::new(self.fx * mx * d + self.cx, self.fy * my * d + self.cy)
    }

    fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64> {
        let mdx = (pixel.x - self.cx) / self.fx;
        let mdy = (pixel.y - self.cy) / self.fy;
        let rd = (mdx * mdx + mdy * mdy).sqrt();
        if rd < SMALL_RADIUS {
            return Vector3::new(mdx, mdy, 1.0);
        }

        // Solve r * d(r) = rd for the undistorted radius
        let mut r = rd;
        for _ in 0..NEWTON_ITERATIONS {
            let r2 = r * r;
            let f = r * self.distortion_factor(r2) - rd;
            let df = 1.0 + r2 * (3.0 * self.k1 + r2 * (5.0 * self.k2 + r2 * 7.0 * self.k3));
            if df.abs() < f64::EPSILON {
                break;
            }
            let step = f / df;
            r -= step;
            if step.abs() < 1e-14 {
                break;
            }
        }

        let scale = r / rd;
        Vector3::new(mdx * scale, mdy * scale, 1.0)
    }
}

/// Field-of-view (Devernay-Faugeras) model with a single parameter `w`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FovCamera {
    pub width: usize,
    pub height: usize,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// Field of view parameter in radians
    pub w: f64,
}

impl CameraModel for FovCamera {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn project(&self, ray: &Vector3<f64>) -> Vector2<f64> {
        let rho = (ray.x * ray.x + ray.y * ray.y).sqrt();
        let factor = if self.w.abs() < SMALL_RADIUS {
            1.0 / ray.z
        } else {
            let two_tan = 2.0 * (self.w / 2.0).tan();
            if rho < SMALL_RADIUS {
                two_tan / (self.w * ray.z)
            } else {
                // atan2 keeps rays beyond 90 degrees on the correct side
                (two_tan * rho).atan2(ray.z) / (self.w * rho)
            }
        };
        Vector2::new(
            self.fx * ray.x * factor + self.cx,
            self.fy * ray.y * factor + self.cy,
        )
    }

    fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64> {
        let mdx = (pixel.x - self.cx) / self.fx;
        let mdy = (pixel.y - self.cy) / self.fy;
        if self.w.abs() < SMALL_RADIUS {
            return Vector3::new(mdx, mdy, 1.0);
        }

        let rd = (mdx * mdx + mdy * mdy).sqrt();
        let angle = rd * self.w;
        let scale = if rd < SMALL_RADIUS {
            self.w
        } else {
            angle.sin() / rd
        };
        let z = 2.0 * (self.w / 2.0).tan() * angle.cos();
        Vector3::new(mdx * scale, mdy * scale, z)
    }
}

/// Kannala-Brandt equidistant fisheye model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KannalaBrandtCamera {
    pub width: usize,
    pub height: usize,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub k1: f64,
    #[serde(default)]
    pub k2: f64,
    #[serde(default)]
    pub k3: f64,
    #[serde(default)]
    pub k4: f64,
}

impl KannalaBrandtCamera {
    #[inline]
    fn distorted_angle(&self, theta: f64) -> f64 {
        let t2 = theta * theta;
        theta * (1.0 + t2 * (self.k1 + t2 * (self.k2 + t2 * (self.k3 + t2 * self.k4))))
    }
}

impl CameraModel for KannalaBrandtCamera {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn project(&self, ray: &Vector3<f64>) -> Vector2<f64> {
        let rho = (ray.x * ray.x + ray.y * ray.y).sqrt();
        let (mx, my) = if rho < SMALL_RADIUS {
            (ray.x / ray.z, ray.y / ray.z)
        } else {
            let theta_d = self.distorted_angle(rho.atan2(ray.z));
            (ray.x / rho * theta_d, ray.y / rho * theta_d)
        };
        Vector2::new(self.fx * mx + self.cx, self.fy * my + self.cy)
    }

    fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64> {
        let mdx = (pixel.x - self.cx) / self.fx;
        let mdy = (pixel.y - self.cy) / self.fy;
        let theta_d = (mdx * mdx + mdy * mdy).sqrt();
        if theta_d < SMALL_RADIUS {
            return Vector3::new(mdx, mdy, 1.0);
        }

        let mut theta = theta_d;
        for _ in 0..NEWTON_ITERATIONS {
            let t2 = theta * theta;
            let f = self.distorted_angle(theta) - theta_d;
            let df = 1.0
                + t2 * (3.0 * self.k1
                    + t2 * (5.0 * self.k2 + t2 * (7.0 * self.k3 + t2 * 9.0 * self.k4)));
            if df.abs() < f64::EPSILON {
                break;
            }
            let step = f / df;
            theta -= step;
            if step.abs() < 1e-14 {
                break;
            }
        }

        let scale = theta.sin() / theta_d;
        Vector3::new(mdx * scale, mdy * scale, theta.cos())
    }
}
