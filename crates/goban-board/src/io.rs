//! JSON configuration for board detection.

use std::{fs, path::Path};

use goban_lattice::LatticeFitParams;
use goban_stones::{BlobParams, PixelClassifierParams, StoneFilterParams};
use serde::{Deserialize, Serialize};

use crate::classify::IntersectionParams;
use crate::detector::{BoardDetector, BoardDetectorParams};

#[derive(thiserror::Error, Debug)]
pub enum BoardConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration for a board detection run.
///
/// Every section is optional; missing sections keep the detector defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardDetectConfig {
    #[serde(default)]
    pub pixel: Option<PixelClassifierParams>,
    #[serde(default)]
    pub blobs: Option<BlobParams>,
    #[serde(default)]
    pub filter: Option<StoneFilterParams>,
    #[serde(default)]
    pub lattice: Option<LatticeFitParams>,
    #[serde(default)]
    pub intersections: Option<IntersectionParams>,
    #[serde(default)]
    pub min_stones: Option<usize>,
    #[serde(default)]
    pub confidence_floor: Option<f32>,
    #[serde(default)]
    pub min_board_support: Option<f32>,
}

impl BoardDetectConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BoardConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), BoardConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Config with every section filled in from `params`.
    pub fn from_params(params: &BoardDetectorParams) -> Self {
        Self {
            pixel: Some(params.pixel),
            blobs: Some(params.blobs.clone()),
            filter: Some(params.filter.clone()),
            lattice: Some(params.lattice.clone()),
            intersections: Some(params.intersections.clone()),
            min_stones: Some(params.min_stones),
            confidence_floor: Some(params.confidence_floor),
            min_board_support: Some(params.min_board_support),
        }
    }

    /// Build detector parameters, applying overrides from the config.
    pub fn build_params(&self) -> BoardDetectorParams {
        let mut params = BoardDetectorParams::default();
        if let Some(pixel) = self.pixel {
            params.pixel = pixel;
        }
        if let Some(blobs) = self.blobs.clone() {
            params.blobs = blobs;
        }
        if let Some(filter) = self.filter.clone() {
            params.filter = filter;
        }
        if let Some(lattice) = self.lattice.clone() {
            params.lattice = lattice;
        }
        if let Some(intersections) = self.intersections.clone() {
            params.intersections = intersections;
        }
        if let Some(min_stones) = self.min_stones {
            params.min_stones = min_stones;
        }
        if let Some(floor) = self.confidence_floor {
            params.confidence_floor = floor;
        }
        if let Some(support) = self.min_board_support {
            params.min_board_support = support;
        }
        params
    }

    /// Build a detector from this config.
    pub fn build_detector(&self) -> BoardDetector {
        BoardDetector::new(self.build_params())
    }
}
