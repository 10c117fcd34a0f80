//! Configuration management for rectilut
//!
//! A rig file describes the source camera, the rotation applied to its rays
//! and the linear target camera the rectified image is rendered into.

use anyhow::{Context, Result};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bounds::valid_region;
use crate::camera::{CameraModel, FovCamera, KannalaBrandtCamera, LinearCamera, Poly3Camera};
use crate::transform::{crop_to_valid_region, rotation_from_euler_deg};

/// Source camera, tagged by its projection model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CameraConfig {
    Linear(LinearCamera),
    Poly3(Poly3Camera),
    Fov(FovCamera),
    KannalaBrandt(KannalaBrandtCamera),
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig::Linear(LinearCamera::new(640, 480, 500.0, 500.0, 319.5, 239.5))
    }
}

impl CameraConfig {
    /// Name of the projection model as written in the rig file
    pub fn model_name(&self) -> &'static str {
        match self {
            CameraConfig::Linear(_) => "linear",
            CameraConfig::Poly3(_) => "poly3",
            CameraConfig::Fov(_) => "fov",
            CameraConfig::KannalaBrandt(_) => "kannala_brandt",
        }
    }

    /// Pinhole part of the camera: size and intrinsics without distortion
    pub fn linear(&self) -> LinearCamera {
        match self {
            CameraConfig::Linear(c) => *c,
            CameraConfig::Poly3(c) => LinearCamera::new(c.width, c.height, c.fx, c.fy, c.cx, c.cy),
            CameraConfig::Fov(c) => LinearCamera::new(c.width, c.height, c.fx, c.fy, c.cx, c.cy),
            CameraConfig::KannalaBrandt(c) => {
                LinearCamera::new(c.width, c.height, c.fx, c.fy, c.cx, c.cy)
            }
        }
    }
}

/// Rotation from the rectified camera frame into the source camera frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Rotation about the optical axis
    #[serde(default)]
    pub roll_deg: f64,
    /// Rotation about the horizontal axis
    #[serde(default)]
    pub pitch_deg: f64,
    /// Rotation about the vertical axis
    #[serde(default)]
    pub yaw_deg: f64,
    /// Explicit row-major matrix, takes precedence over the angles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[[f64; 3]; 3]>,
}

impl RotationConfig {
    pub fn matrix(&self) -> Matrix3<f64> {
        match &self.matrix {
            Some(rows) => Matrix3::from_fn(|r, c| rows[r][c]),
            None => rotation_from_euler_deg(self.roll_deg, self.pitch_deg, self.yaw_deg),
        }
    }
}

/// Rectified (linear) output camera; unset fields inherit from the source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cy: Option<f64>,
    /// Shrink the output to the region every source row and column covers
    #[serde(default)]
    pub crop_to_valid: bool,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub rotation: RotationConfig,

    #[serde(default)]
    pub target: TargetConfig,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Source camera as a trait object for the builder and bound finders
    pub fn camera_model(&self) -> Box<dyn CameraModel> {
        match &self.camera {
            CameraConfig::Linear(c) => Box::new(*c),
            CameraConfig::Poly3(c) => Box::new(*c),
            CameraConfig::Fov(c) => Box::new(*c),
            CameraConfig::KannalaBrandt(c) => Box::new(*c),
        }
    }

    /// `R_on`, taking rays of the target camera into the source frame
    pub fn rotation(&self) -> Matrix3<f64> {
        self.rotation.matrix()
    }

    /// Resolve the target camera, applying the valid-region crop if enabled.
    pub fn target_camera(&self) -> Result<LinearCamera> {
        let source = self.camera.linear();
        let t = &self.target;
        let target = LinearCamera::new(
            t.width.unwrap_or(source.width),
            t.height.unwrap_or(source.height),
            t.fx.unwrap_or(source.fx),
            t.fy.unwrap_or(source.fy),
            t.cx.unwrap_or(source.cx),
            t.cy.unwrap_or(source.cy),
        );

        if !t.crop_to_valid {
            return Ok(target);
        }

        // Bound finders trace the source border into the rotated frame
        let camera = self.camera_model();
        let (cols, rows) = valid_region(camera.as_ref(), &self.rotation().transpose());
        let cropped = crop_to_valid_region(&target.k(), &cols, &rows)
            .with_context(|| format!("No valid region left: cols {}, rows {}", cols, rows))?;

        // The crop can never grow past the configured target size
        let width = cropped.width.min(target.width.saturating_sub(cropped.offset.0));
        let height = cropped.height.min(target.height.saturating_sub(cropped.offset.1));
        anyhow::ensure!(
            width > 0 && height > 0,
            "Valid region {}x{} at {:?} lies outside the {}x{} target",
            cropped.width,
            cropped.height,
            cropped.offset,
            target.width,
            target.height
        );

        tracing::info!(
            "Cropped target to {}x{} at offset {:?}",
            width,
            height,
            cropped.offset
        );
        Ok(LinearCamera::from_matrix(width, height, &cropped.k))
    }
}
