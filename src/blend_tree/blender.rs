//! Parametric weight solvers. Both blenders map an input value to weights over sample
//! indices; they know nothing about clips or tree nodes.

use std::f32::consts::PI;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::utils::{angle_between, project_on_plane, repeat, vec2_angle};

/// At most two `(sample index, weight)` pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Blender1DResult {
    weights: [(usize, f32); 2],
    len: usize,
}
impl Blender1DResult {
    pub fn as_slice(&self) -> &[(usize, f32)] {
        &self.weights[..self.len]
    }

    fn set_one(&mut self, idx: usize) {
        self.weights[0] = (idx, 1.0);
        self.len = 1;
    }
}

/// Piecewise-linear blending between scalar samples.
#[derive(Debug, Clone, Default)]
pub struct Blender1D {
    /// (sample index, value), sorted by value
    samples: Vec<(usize, f32)>,
}
impl Blender1D {
    pub fn samples_len(&self) -> usize {
        self.samples.len()
    }

    /// Non-finite values are left out, so those samples never receive weight.
    pub fn set_samples(&mut self, values: &[f32]) {
        self.samples.clear();
        self.samples
            .extend(values.iter().copied().enumerate().filter(|(_, v)| v.is_finite()));
        if self.samples.len() != values.len() {
            log::warn!("ignoring {} non-finite 1D blend samples", values.len() - self.samples.len());
        }
        self.samples.sort_by(|a, b| a.1.total_cmp(&b.1));
    }

    /// A non-finite `value` selects the lowest sample.
    pub fn get(&self, result: &mut Blender1DResult, value: f32) {
        result.len = 0;
        let (Some(first), Some(last)) = (self.samples.first(), self.samples.last()) else {
            return;
        };
        if !value.is_finite() || value <= first.1 {
            result.set_one(first.0);
        } else if value >= last.1 {
            result.set_one(last.0);
        } else {
            let Some(i_greater) = self.samples.iter().position(|s| s.1 > value) else {
                result.set_one(last.0);
                return;
            };
            let (lower_idx, lower) = self.samples[i_greater - 1];
            let (upper_idx, upper) = self.samples[i_greater];
            let x = upper - lower;
            result.weights[0] = (lower_idx, (upper - value) / x);
            result.weights[1] = (upper_idx, (value - lower) / x);
            result.len = 2;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Blend2DMode {
    SimpleDirectional,
    FreeformCartesian,
    #[default]
    FreeformDirectional,
}

/// Blending over 2D sample points, e.g. a velocity space.
#[derive(Debug, Clone, Default)]
pub struct Blender2D {
    samples: Vec<Vec2>,
}
impl Blender2D {
    pub fn samples_len(&self) -> usize {
        self.samples.len()
    }

    pub fn set_samples(&mut self, samples: &[Vec2]) {
        self.samples.clear();
        self.samples.extend_from_slice(samples);
    }

    /// Writes one weight per sample into `result`.
    pub fn get(&self, mode: Blend2DMode, result: &mut Vec<f32>, queried: Vec2) {
        result.clear();
        result.resize(self.samples.len(), 0.0);
        if self.samples.is_empty() {
            return;
        }
        match mode {
            Blend2DMode::SimpleDirectional => self.simple_directional(result, queried),
            Blend2DMode::FreeformCartesian => self.freeform_cartesian(result, queried),
            Blend2DMode::FreeformDirectional => self.freeform_directional(result, queried),
        }
    }

    fn simple_directional(&self, result: &mut [f32], queried: Vec2) {
        let Some((first, second, center)) = self.closest_angle_samples(queried) else {
            // only center samples
            let share = 1.0 / result.len() as f32;
            match self.samples.iter().position(|s| *s == Vec2::ZERO) {
                Some(center) => result[center] = 1.0,
                None => result.iter_mut().for_each(|w| *w = share),
            }
            return;
        };
        let (t1, t2) = Self::directional_influence(queried, self.samples[first], self.samples[second]);

        let unclamped = t1 + t2;
        let node_part = unclamped.clamp(0.0, 1.0);
        if unclamped > 0.0 {
            result[first] += t1 / unclamped * node_part;
            result[second] += t2 / unclamped * node_part;
        }

        if node_part < 1.0 {
            let center_part = 1.0 - node_part;
            match center {
                Some(center) => result[center] = center_part,
                None => {
                    let average = center_part / result.len() as f32;
                    result.iter_mut().for_each(|w| *w += average);
                }
            }
        }
    }

    /// Returns the samples bracketing `queried` counter-clockwise and clockwise, plus the
    /// zero-vector sample if there is one.
    fn closest_angle_samples(&self, queried: Vec2) -> Option<(usize, usize, Option<usize>)> {
        let queried_angle = queried.y.atan2(queried.x);
        let mut center = None;
        let mut lowest: Option<(usize, f32)> = None;
        let mut highest: Option<(usize, f32)> = None;
        for (idx, sample) in self.samples.iter().enumerate() {
            if *sample == Vec2::ZERO {
                center = Some(idx);
                continue;
            }
            let dangle = repeat(sample.y.atan2(sample.x) - queried_angle, 2.0 * PI);
            if lowest.map_or(true, |(_, d)| dangle < d) {
                lowest = Some((idx, dangle));
            }
            if highest.map_or(true, |(_, d)| dangle >= d) {
                highest = Some((idx, dangle));
            }
        }
        Some((lowest?.0, highest?.0, center))
    }

    /// Solves `queried = first * t1 + second * t2`; degenerate or negative solutions split
    /// evenly.
    fn directional_influence(queried: Vec2, first: Vec2, second: Vec2) -> (f32, f32) {
        let det = first.x * second.y - second.x * first.y;
        if det == 0.0 {
            return (0.5, 0.5);
        }
        let inv_det = 1.0 / det;
        let inv00 = second.y * inv_det;
        let inv10 = -first.y * inv_det;
        let inv01 = -second.x * inv_det;
        let inv11 = first.x * inv_det;
        let t1 = inv00 * queried.x + inv01 * queried.y;
        let t2 = inv10 * queried.x + inv11 * queried.y;
        if t1 < 0.0 || t2 < 0.0 {
            (0.5, 0.5)
        } else {
            (t1, t2)
        }
    }

    fn freeform_cartesian(&self, result: &mut [f32], queried: Vec2) {
        self.freeform(result, |pi, pj| (queried - pi, pj - pi));
    }

    fn freeform_directional(&self, result: &mut [f32], queried: Vec2) {
        let queried3 = queried.extend(0.0);
        self.freeform(result, |pi, pj| {
            let mut queried_projected = queried3;
            let (a_ij, a_iq, angle_multiplier) = if pi == Vec2::ZERO {
                (vec2_angle(queried, pj), 0.0, 1.0)
            } else if pj == Vec2::ZERO {
                let a = vec2_angle(queried, pi);
                (a, a, 1.0)
            } else {
                let a_ij = vec2_angle(pi, pj);
                let a_iq = if a_ij <= 0.0 {
                    0.0
                } else if queried == Vec2::ZERO {
                    a_ij
                } else {
                    let pi3 = pi.extend(0.0);
                    let axis = pi3.cross(pj.extend(0.0));
                    queried_projected = project_on_plane(queried3, axis);
                    let a = angle_between(pi3, queried_projected);
                    if a_ij < PI * 0.99 && pi3.cross(queried_projected).dot(axis) < 0.0 {
                        -a
                    } else {
                        a
                    }
                };
                (a_ij, a_iq, 2.0)
            };
            let len_pi = pi.length();
            let len_pj = pj.length();
            let deno = (len_pj + len_pi) / 2.0;
            let pipj = Vec2::new((len_pj - len_pi) / deno, a_ij * angle_multiplier);
            let pip = Vec2::new((queried_projected.length() - len_pi) / deno, a_iq * angle_multiplier);
            (pip, pipj)
        });
    }

    /// Gradient-band interpolation: each sample's influence is the minimum over all other
    /// samples of how far the query sits from that pair's far end.
    fn freeform(&self, result: &mut [f32], influence: impl Fn(Vec2, Vec2) -> (Vec2, Vec2)) {
        let mut sum = 0.0;
        for (i, pi) in self.samples.iter().enumerate() {
            let mut hi = f32::MAX;
            for (j, pj) in self.samples.iter().enumerate() {
                if i == j {
                    continue;
                }
                let (pip, pipj) = influence(*pi, *pj);
                let len_sq = pipj.length_squared();
                if !(len_sq > 0.0) {
                    continue;
                }
                let t = 1.0 - pip.dot(pipj) / len_sq;
                if t < 0.0 {
                    hi = 0.0;
                    break;
                }
                hi = hi.min(t);
            }
            result[i] = hi;
            sum += hi;
        }

        if sum > 0.0 && sum.is_finite() {
            result.iter_mut().for_each(|w| *w /= sum);
        } else {
            let share = 1.0 / result.len() as f32;
            result.iter_mut().for_each(|w| *w = share);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blender_1d(values: &[f32]) -> Blender1D {
        let mut blender = Blender1D::default();
        blender.set_samples(values);
        blender
    }

    fn sum(weights: &[f32]) -> f32 {
        weights.iter().sum()
    }

    #[test]
    fn one_d_clamps_at_boundaries() {
        let blender = blender_1d(&[2.0, 0.0, 1.0]);
        let mut result = Blender1DResult::default();
        blender.get(&mut result, -5.0);
        assert_eq!(result.as_slice(), &[(1, 1.0)]);
        blender.get(&mut result, 2.0);
        assert_eq!(result.as_slice(), &[(0, 1.0)]);
    }

    #[test]
    fn one_d_is_partition_of_unity() {
        let blender = blender_1d(&[0.0, 1.0, 3.0]);
        let mut result = Blender1DResult::default();
        for i in 0..=30 {
            let v = i as f32 * 0.1;
            blender.get(&mut result, v);
            let total: f32 = result.as_slice().iter().map(|(_, w)| w).sum();
            assert!((total - 1.0).abs() < 1e-5, "v = {v}, total = {total}");
        }
        blender.get(&mut result, 2.0);
        assert_eq!(result.as_slice().len(), 2);
        assert_eq!(result.as_slice()[0].0, 1);
        assert!((result.as_slice()[0].1 - 0.5).abs() < 1e-6);
        assert_eq!(result.as_slice()[1].0, 2);
        assert!((result.as_slice()[1].1 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn one_d_non_finite_input_picks_lowest_sample() {
        let mut result = Blender1DResult::default();
        blender_1d(&[0.0]).get(&mut result, f32::NAN);
        assert_eq!(result.as_slice(), &[(0, 1.0)]);

        let blender = blender_1d(&[1.0, 0.0]);
        for value in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            blender.get(&mut result, value);
            assert_eq!(result.as_slice(), &[(1, 1.0)], "value = {value}");
        }
    }

    #[test]
    fn one_d_skips_non_finite_samples() {
        let blender = blender_1d(&[0.0, f32::NAN, 1.0]);
        assert_eq!(blender.samples_len(), 2);
        let mut result = Blender1DResult::default();
        blender.get(&mut result, 0.5);
        assert_eq!(result.as_slice(), &[(0, 0.5), (2, 0.5)]);
        blender.get(&mut result, 7.0);
        assert_eq!(result.as_slice(), &[(2, 1.0)]);
    }

    #[test]
    fn one_d_without_samples_is_empty() {
        let mut result = Blender1DResult::default();
        Blender1D::default().get(&mut result, 0.3);
        assert!(result.as_slice().is_empty());
    }

    fn directions() -> Blender2D {
        let mut blender = Blender2D::default();
        blender.set_samples(&[Vec2::ZERO, Vec2::Y, Vec2::X, -Vec2::Y, -Vec2::X]);
        blender
    }

    #[test]
    fn simple_directional_splits_between_neighbours() {
        let blender = directions();
        let mut result = vec![];
        blender.get(Blend2DMode::SimpleDirectional, &mut result, Vec2::new(0.5, 0.5));
        assert!((result[1] - 0.5).abs() < 1e-5);
        assert!((result[2] - 0.5).abs() < 1e-5);
        assert_eq!(result[0], 0.0);
        assert!((sum(&result) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn simple_directional_gives_residual_to_center() {
        let blender = directions();
        let mut result = vec![];
        blender.get(Blend2DMode::SimpleDirectional, &mut result, Vec2::new(0.25, 0.0));
        assert!((result[0] - 0.75).abs() < 1e-5);
        assert!((sum(&result) - 1.0).abs() < 1e-5);

        blender.get(Blend2DMode::SimpleDirectional, &mut result, Vec2::ZERO);
        assert!((result[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn simple_directional_without_center_spreads_residual() {
        let mut blender = Blender2D::default();
        blender.set_samples(&[Vec2::X, Vec2::Y, -Vec2::X]);
        let mut result = vec![];
        blender.get(Blend2DMode::SimpleDirectional, &mut result, Vec2::new(0.2, 0.2));
        assert!((sum(&result) - 1.0).abs() < 1e-5);
        assert!(result[2] > 0.0);
    }

    #[test]
    fn simple_directional_negative_solution_splits_evenly() {
        let mut blender = Blender2D::default();
        blender.set_samples(&[Vec2::X, Vec2::Y]);
        let mut result = vec![];
        // (-1, -1) = -X - Y, both coefficients negative
        blender.get(Blend2DMode::SimpleDirectional, &mut result, Vec2::new(-1.0, -1.0));
        assert!((result[0] - 0.5).abs() < 1e-6);
        assert!((result[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn simple_directional_single_direction_is_degenerate_split() {
        let mut blender = Blender2D::default();
        blender.set_samples(&[Vec2::X]);
        let mut result = vec![];
        blender.get(Blend2DMode::SimpleDirectional, &mut result, Vec2::Y);
        assert_eq!(result, vec![1.0]);
    }

    #[test]
    fn freeform_hits_samples_exactly() {
        for mode in [Blend2DMode::FreeformCartesian, Blend2DMode::FreeformDirectional] {
            let blender = directions();
            let mut result = vec![];
            blender.get(mode, &mut result, Vec2::X);
            assert!((result[2] - 1.0).abs() < 1e-4, "{mode:?}: {result:?}");
            assert!((sum(&result) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn freeform_weights_are_normalized() {
        for mode in [Blend2DMode::FreeformCartesian, Blend2DMode::FreeformDirectional] {
            let blender = directions();
            let mut result = vec![];
            blender.get(mode, &mut result, Vec2::new(0.3, -0.6));
            assert!((sum(&result) - 1.0).abs() < 1e-5, "{mode:?}: {result:?}");
            assert!(result.iter().all(|w| *w >= 0.0));
            assert!(result[3] > result[1]);
        }
    }

    #[test]
    fn freeform_single_sample_takes_everything() {
        let mut blender = Blender2D::default();
        blender.set_samples(&[Vec2::new(1.0, 2.0)]);
        let mut result = vec![];
        blender.get(Blend2DMode::FreeformCartesian, &mut result, Vec2::new(-4.0, 0.0));
        assert_eq!(result, vec![1.0]);
    }
}
