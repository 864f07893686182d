use log::debug;
use nalgebra::{Matrix2, Point2};
use serde::{Deserialize, Serialize};

use crate::params::{BlobParams, Connectivity};
use crate::pixel::{PixelClass, PixelMap};

const DX: [isize; 8] = [1, 0, -1, 0, 1, -1, -1, 1];
const DY: [isize; 8] = [0, -1, 0, 1, -1, -1, 1, 1];

fn neighbour_count(c: Connectivity) -> usize {
    match c {
        Connectivity::Four => 4,
        Connectivity::Eight => 8,
    }
}

/// A connected group of `Dark` pixels, summarised by its moments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub pixel_count: usize,
    pub centroid: Point2<f32>,
    /// Pixel-coordinate covariance `[xx, xy, yy]`, each pixel treated as a unit square.
    pub covariance: [f32; 3],
    /// Ellipse semi-axes `2·√λ` from the covariance eigenvalues.
    pub semi_major: f32,
    pub semi_minor: f32,
    /// Direction of the major axis, radians.
    pub angle: f32,
    /// Inclusive bounding box `[x0, y0, x1, y1]`.
    pub bbox: [usize; 4],
    /// Some pixel lies on the outermost image row or column.
    pub touches_border: bool,
}

impl Blob {
    #[inline]
    pub fn axis_ratio(&self) -> f32 {
        self.semi_major / self.semi_minor.max(f32::EPSILON)
    }

    /// Area-equivalent radius.
    #[inline]
    pub fn radius(&self) -> f32 {
        (self.pixel_count as f32 / std::f32::consts::PI).sqrt()
    }
}

#[derive(Default)]
struct Moments {
    n: usize,
    sx: f64,
    sy: f64,
    sxx: f64,
    sxy: f64,
    syy: f64,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl Moments {
    fn start(x: usize, y: usize) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
            ..Self::default()
        }
    }

    fn push(&mut self, x: usize, y: usize) {
        let (fx, fy) = (x as f64, y as f64);
        self.n += 1;
        self.sx += fx;
        self.sy += fy;
        self.sxx += fx * fx;
        self.sxy += fx * fy;
        self.syy += fy * fy;
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x);
        self.y1 = self.y1.max(y);
    }

    fn into_blob(self, width: usize, height: usize) -> Blob {
        let n = self.n as f64;
        let mx = self.sx / n;
        let my = self.sy / n;
        // A unit pixel adds 1/12 variance along each axis.
        let cxx = self.sxx / n - mx * mx + 1.0 / 12.0;
        let cxy = self.sxy / n - mx * my;
        let cyy = self.syy / n - my * my + 1.0 / 12.0;

        let eig = Matrix2::new(cxx, cxy, cxy, cyy).symmetric_eigen();
        let (major, minor) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
            (0, 1)
        } else {
            (1, 0)
        };
        let axis = eig.eigenvectors.column(major);
        let lambda_major = eig.eigenvalues[major].max(0.0);
        let lambda_minor = eig.eigenvalues[minor].max(0.0);

        Blob {
            pixel_count: self.n,
            centroid: Point2::new(mx as f32, my as f32),
            covariance: [cxx as f32, cxy as f32, cyy as f32],
            semi_major: (2.0 * lambda_major.sqrt()) as f32,
            semi_minor: (2.0 * lambda_minor.sqrt()) as f32,
            angle: axis[1].atan2(axis[0]) as f32,
            bbox: [self.x0, self.y0, self.x1, self.y1],
            touches_border: self.x0 == 0
                || self.y0 == 0
                || self.x1 + 1 == width
                || self.y1 + 1 == height,
        }
    }
}

/// Connected-component labelling of `Dark` pixels.
#[derive(Clone, Debug)]
pub struct BlobExtractor {
    params: BlobParams,
}

impl BlobExtractor {
    pub fn new(params: BlobParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BlobParams {
        &self.params
    }

    /// Flood-fill every `Dark` component (explicit stack, no recursion).
    ///
    /// Components touching the border are kept and flagged.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, map), fields(width = map.width, height = map.height))
    )]
    pub fn extract(&self, map: &PixelMap) -> Vec<Blob> {
        let (w, h) = (map.width, map.height);
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let k = neighbour_count(self.params.connectivity);
        let mut visited = vec![false; w * h];
        let mut stack: Vec<usize> = Vec::new();
        let mut blobs = Vec::new();
        let mut dropped = 0usize;

        for start in 0..w * h {
            if visited[start] || map.classes[start] != PixelClass::Dark {
                continue;
            }
            visited[start] = true;
            stack.push(start);
            let mut m = Moments::start(start % w, start / w);

            while let Some(idx) = stack.pop() {
                let (x, y) = (idx % w, idx / w);
                m.push(x, y);
                for d in 0..k {
                    let nx = x as isize + DX[d];
                    let ny = y as isize + DY[d];
                    if nx < 0 || ny < 0 || nx as usize >= w || ny as usize >= h {
                        continue;
                    }
                    let nidx = ny as usize * w + nx as usize;
                    if !visited[nidx] && map.classes[nidx] == PixelClass::Dark {
                        visited[nidx] = true;
                        stack.push(nidx);
                    }
                }
            }

            if m.n >= self.params.min_pixels {
                blobs.push(m.into_blob(w, h));
            } else {
                dropped += 1;
            }
        }

        debug!(
            "labelled {} dark blobs ({} below {} px dropped)",
            blobs.len(),
            dropped,
            self.params.min_pixels
        );
        blobs
    }
}
