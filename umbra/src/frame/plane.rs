use std::ops::{Deref, DerefMut, Index, IndexMut};

use rayon::prelude::*;

use super::FrameDimensions;

/// Chunk size for parallel operations to avoid false cache sharing.
/// 32KB worth of f64 values keeps each chunk spanning many cache lines.
const CHUNK_SIZE: usize = 4096;

/// Row-major 2D plane of `f64` pixels.
///
/// The first image axis is the row (`y`), the second is the column (`x`).
/// Elementwise operations require identical dimensions and panic otherwise:
/// shapes are validated once at ingestion, so a mismatch here is a bug.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pixels: Vec<f64>,
    width: usize,
    height: usize,
}

impl Plane {
    pub fn new(width: usize, height: usize, pixels: Vec<f64>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }

    pub fn zeros(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    /// Build a plane by evaluating `f` for every linear pixel index in parallel.
    pub fn from_pixel_fn<F>(dimensions: FrameDimensions, f: F) -> Self
    where
        F: Fn(usize) -> f64 + Sync + Send,
    {
        let mut pixels = vec![0.0f64; dimensions.pixel_count()];
        pixels
            .par_chunks_mut(CHUNK_SIZE)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let start_idx = chunk_idx * CHUNK_SIZE;
                for (i, val) in chunk.iter_mut().enumerate() {
                    *val = f(start_idx + i);
                }
            });
        Self::new(dimensions.width, dimensions.height, pixels)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions {
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    pub fn pixels(&self) -> &[f64] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [f64] {
        &mut self.pixels
    }

    #[inline]
    pub fn into_vec(self) -> Vec<f64> {
        self.pixels
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        debug_assert!(x < self.width && y < self.height);
        self.pixels[y * self.width + x]
    }

    fn assert_same_shape(&self, other: &Plane, what: &str) {
        assert!(
            self.width == other.width && self.height == other.height,
            "{} dimensions mismatch: {}x{} vs {}x{}",
            what,
            self.width,
            self.height,
            other.width,
            other.height
        );
    }

    /// `self -= other`, elementwise.
    pub fn subtract(&mut self, other: &Plane) {
        self.assert_same_shape(other, "Subtrahend");
        self.pixels
            .par_iter_mut()
            .zip(other.pixels.par_iter())
            .for_each(|(p, o)| *p -= o);
    }

    /// `self /= other`, elementwise. Division by zero follows IEEE semantics.
    pub fn divide(&mut self, other: &Plane) {
        self.assert_same_shape(other, "Divisor");
        self.pixels
            .par_iter_mut()
            .zip(other.pixels.par_iter())
            .for_each(|(p, o)| *p /= o);
    }

    /// `slope * x + intercept`, elementwise.
    pub fn affine(slope: &Plane, x: f64, intercept: &Plane) -> Plane {
        slope.assert_same_shape(intercept, "Intercept");
        let pixels = slope
            .pixels
            .par_iter()
            .zip(intercept.pixels.par_iter())
            .map(|(a, b)| a * x + b)
            .collect();
        Plane::new(slope.width, slope.height, pixels)
    }

    /// Mean taken along the first image axis: one value per column.
    pub fn column_means(&self) -> Vec<f64> {
        let inv_height = 1.0 / self.height as f64;
        (0..self.width)
            .into_par_iter()
            .map(|x| {
                let sum: f64 = (0..self.height)
                    .map(|y| self.pixels[y * self.width + x])
                    .sum();
                sum * inv_height
            })
            .collect()
    }

    /// Divide every row elementwise by `divisors` (one value per column).
    pub fn divide_columns(&mut self, divisors: &[f64]) {
        assert_eq!(
            divisors.len(),
            self.width,
            "one divisor per column required"
        );
        self.pixels.par_chunks_mut(self.width).for_each(|row| {
            for (p, d) in row.iter_mut().zip(divisors) {
                *p /= d;
            }
        });
    }

    /// Whole-plane mean.
    pub fn mean(&self) -> f64 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .pixels
            .par_chunks(CHUNK_SIZE)
            .map(|chunk| chunk.iter().sum::<f64>())
            .sum();
        sum / self.pixels.len() as f64
    }
}

impl Index<(usize, usize)> for Plane {
    type Output = f64;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl IndexMut<(usize, usize)> for Plane {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

impl Index<usize> for Plane {
    type Output = f64;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.pixels[idx]
    }
}

impl IndexMut<usize> for Plane {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.pixels[idx]
    }
}

impl Deref for Plane {
    type Target = [f64];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}

impl DerefMut for Plane {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pixels
    }
}
