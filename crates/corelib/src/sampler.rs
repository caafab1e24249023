//! Keyframe sampler with cyclic lookup.
//!
//! A [`Sampler`] maps strictly increasing scalar keys (usually time) to
//! values. Lookups wrap the input into `[min_key, max_key)` so an animation
//! loops forever, then either hold the floor keyframe ([`Interpolation::Step`])
//! or blend towards the next keyframe ([`Interpolation::Linear`]).
//!
//! Blending goes through the interpolator registered when the sampler was
//! built. Each call returns a fresh value; nothing is shared between calls.

use thiserror::Error;

use crate::Lerp;

/// How a keyframe's value is carried towards the next keyframe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Hold the value until the next keyframe.
    Step,
    /// Blend proportionally to the elapsed position between two keyframes.
    Linear,
}

/// A keyframe value together with the interpolation leaving it.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplerValue<T> {
    pub value: T,
    pub interpolation: Interpolation,
}

impl<T> SamplerValue<T> {
    pub fn new(value: T, interpolation: Interpolation) -> Self {
        Self {
            value,
            interpolation,
        }
    }

    pub fn step(value: T) -> Self {
        Self::new(value, Interpolation::Step)
    }

    pub fn linear(value: T) -> Self {
        Self::new(value, Interpolation::Linear)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SampleError {
    #[error("No interpolator registered for {interpolation:?} sampling")]
    Unsupported { interpolation: Interpolation },

    #[error("Sample keys must be finite, got {0}")]
    NonFiniteKey(f32),

    #[error("Sampler input must be finite, got {0}")]
    NonFiniteInput(f32),
}

/// Blends `a` towards `b` at normalized position `t`.
pub type Interpolator<T> = fn(&T, &T, f32) -> T;

/// Ordered keyframe store. Keys are unique and kept sorted.
#[derive(Clone, Debug)]
pub struct Sampler<T> {
    samples: Vec<(f32, SamplerValue<T>)>,
    min_key: f32,
    max_key: f32,
    linear: Option<Interpolator<T>>,
}

impl<T> Default for Sampler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sampler<T> {
    /// Sampler without an interpolator: step keyframes only.
    /// Sampling a [`Interpolation::Linear`] keyframe fails with [`SampleError::Unsupported`].
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            min_key: f32::INFINITY,
            max_key: f32::NEG_INFINITY,
            linear: None,
        }
    }

    /// Sampler that blends linear keyframes with `interpolator`.
    pub fn with_interpolator(interpolator: Interpolator<T>) -> Self {
        Self {
            linear: Some(interpolator),
            ..Self::new()
        }
    }

    /// Sampler that blends linear keyframes with the value type's own [`Lerp`].
    pub fn interpolated() -> Self
    where
        T: Lerp,
    {
        Self::with_interpolator(<T as Lerp>::lerp)
    }

    pub fn has_interpolator(&self) -> bool {
        self.linear.is_some()
    }

    /// Insert a keyframe. A keyframe already stored at `key` is replaced.
    pub fn add_sample(&mut self, key: f32, value: SamplerValue<T>) -> Result<(), SampleError> {
        if !key.is_finite() {
            return Err(SampleError::NonFiniteKey(key));
        }

        match self
            .samples
            .binary_search_by(|(existing, _)| existing.total_cmp(&key))
        {
            Ok(i) => {
                log::trace!("Replacing keyframe at {}", key);
                self.samples[i].1 = value;
            }
            Err(i) => self.samples.insert(i, (key, value)),
        }

        self.min_key = self.min_key.min(key);
        self.max_key = self.max_key.max(key);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn min_key(&self) -> Option<f32> {
        (!self.is_empty()).then_some(self.min_key)
    }

    pub fn max_key(&self) -> Option<f32> {
        (!self.is_empty()).then_some(self.max_key)
    }

    /// Keys in non-decreasing order.
    pub fn keys(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().map(|(key, _)| *key)
    }

    /// Keyframes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (f32, &SamplerValue<T>)> {
        self.samples.iter().map(|(key, value)| (*key, value))
    }

    /// Sample the keyframes at `input`.
    ///
    /// Returns `Ok(None)` for an empty sampler. A single keyframe is returned
    /// as-is for every input.
    pub fn get_sample(&self, input: f32) -> Result<Option<T>, SampleError>
    where
        T: Clone,
    {
        match self.samples.as_slice() {
            [] => return Ok(None),
            [(_, only)] => return Ok(Some(only.value.clone())),
            _ => {}
        }

        if !input.is_finite() {
            return Err(SampleError::NonFiniteInput(input));
        }

        let trimmed = self.wrap(input);

        // rem_euclid may round up to the full range, so clamp the floor into the table.
        let floor = self
            .samples
            .partition_point(|(key, _)| *key <= trimmed)
            .saturating_sub(1);
        let (floor_key, floor_value) = &self.samples[floor];

        match floor_value.interpolation {
            Interpolation::Step => Ok(Some(floor_value.value.clone())),
            Interpolation::Linear => {
                let interpolate = self.linear.ok_or(SampleError::Unsupported {
                    interpolation: Interpolation::Linear,
                })?;
                let (next_key, next_value) =
                    self.samples.get(floor + 1).unwrap_or(&self.samples[0]);
                let pos = (trimmed - floor_key) / (next_key - floor_key);
                Ok(Some(interpolate(&floor_value.value, &next_value.value, pos)))
            }
        }
    }

    /// Wrap `input` into `[min_key, max_key)`.
    fn wrap(&self, input: f32) -> f32 {
        let range = self.max_key - self.min_key;
        self.min_key + (input - self.min_key).rem_euclid(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Sampler<f32> {
        let mut sampler = Sampler::interpolated();
        for (key, value) in [(1.0, 5.0), (2.0, 10.0), (3.0, 15.0), (4.0, 5.0)] {
            sampler.add_sample(key, SamplerValue::linear(value)).unwrap();
        }
        sampler
    }

    fn approx(actual: Option<f32>, expected: f32) {
        let actual = actual.expect("sample");
        assert!((actual - expected).abs() < 1e-5, "{actual} != {expected}");
    }

    #[test]
    fn empty_sampler_yields_nothing() {
        let sampler: Sampler<f32> = Sampler::interpolated();
        assert_eq!(sampler.get_sample(3.0), Ok(None));
        assert_eq!(sampler.min_key(), None);
    }

    #[test]
    fn single_keyframe_is_constant() {
        let mut sampler = Sampler::interpolated();
        sampler.add_sample(2.0, SamplerValue::linear(42.0f32)).unwrap();
        assert_eq!(sampler.get_sample(-100.0), Ok(Some(42.0)));
        assert_eq!(sampler.get_sample(2.0), Ok(Some(42.0)));
        assert_eq!(sampler.get_sample(1e6), Ok(Some(42.0)));
    }

    #[test]
    fn linear_blend_between_keys() {
        let sampler = ramp();
        approx(sampler.get_sample(1.5).unwrap(), 7.5);
        approx(sampler.get_sample(2.0).unwrap(), 10.0);
        approx(sampler.get_sample(3.5).unwrap(), 10.0);
    }

    #[test]
    fn input_wraps_into_key_range() {
        let sampler = ramp();
        // max_key wraps back onto min_key
        approx(sampler.get_sample(4.0).unwrap(), 5.0);
        // 4.5 is 1.5 one cycle later
        approx(sampler.get_sample(4.5).unwrap(), 7.5);
        // 0.0 is 3.0 one cycle earlier; negative remainders are corrected
        approx(sampler.get_sample(0.0).unwrap(), 15.0);
        approx(sampler.get_sample(-1.5).unwrap(), 7.5);
        approx(sampler.get_sample(7.5).unwrap(), 7.5);
    }

    #[test]
    fn last_segment_blends_towards_final_key() {
        let sampler = ramp();
        approx(sampler.get_sample(3.75).unwrap(), 7.5);
    }

    #[test]
    fn step_holds_floor_value() {
        let mut sampler = Sampler::interpolated();
        sampler.add_sample(0.0, SamplerValue::step(1.0f32)).unwrap();
        sampler.add_sample(1.0, SamplerValue::linear(3.0)).unwrap();
        sampler.add_sample(2.0, SamplerValue::step(9.0)).unwrap();
        approx(sampler.get_sample(0.9).unwrap(), 1.0);
        approx(sampler.get_sample(1.5).unwrap(), 6.0);
    }

    #[test]
    fn keys_are_sorted_and_unique() {
        let mut sampler = Sampler::interpolated();
        for key in [3.0, 1.0, 2.0, 1.0] {
            sampler.add_sample(key, SamplerValue::step(key * 10.0)).unwrap();
        }
        assert_eq!(sampler.keys().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(sampler.min_key(), Some(1.0));
        assert_eq!(sampler.max_key(), Some(3.0));
        assert_eq!(sampler.len(), 3);
        let (first_key, first) = sampler.iter().next().unwrap();
        assert_eq!((first_key, first.value), (1.0, 10.0));
        assert!(sampler.iter().all(|(key, s)| s.value == key * 10.0));
    }

    #[test]
    fn linear_without_interpolator_is_unsupported() {
        let mut sampler: Sampler<String> = Sampler::new();
        assert!(!sampler.has_interpolator());
        sampler.add_sample(0.0, SamplerValue::step("idle".to_owned())).unwrap();
        sampler.add_sample(1.0, SamplerValue::linear("walk".to_owned())).unwrap();
        sampler.add_sample(2.0, SamplerValue::step("run".to_owned())).unwrap();

        assert_eq!(sampler.get_sample(0.5), Ok(Some("idle".to_owned())));
        assert_eq!(
            sampler.get_sample(1.5),
            Err(SampleError::Unsupported {
                interpolation: Interpolation::Linear
            })
        );
    }

    #[test]
    fn custom_interpolator_is_used() {
        fn nearest(a: &i32, b: &i32, t: f32) -> i32 {
            if t < 0.5 { *a } else { *b }
        }
        let mut sampler: Sampler<i32> = Sampler::with_interpolator(nearest);
        assert!(sampler.has_interpolator());
        sampler.add_sample(0.0, SamplerValue::linear(1)).unwrap();
        sampler.add_sample(1.0, SamplerValue::linear(2)).unwrap();
        sampler.add_sample(2.0, SamplerValue::linear(3)).unwrap();
        assert_eq!(sampler.get_sample(0.4), Ok(Some(1)));
        assert_eq!(sampler.get_sample(0.6), Ok(Some(2)));
    }

    #[test]
    fn non_finite_keys_and_inputs_are_rejected() {
        let mut sampler = ramp();
        assert_eq!(
            sampler.add_sample(f32::NAN, SamplerValue::linear(0.0)).map_err(|e| e.to_string()),
            Err("Sample keys must be finite, got NaN".to_owned())
        );
        assert!(matches!(
            sampler.get_sample(f32::INFINITY),
            Err(SampleError::NonFiniteInput(_))
        ));
    }

    #[test]
    fn matrix_values_blend() {
        use crate::{Mat4, vec3};
        let mut sampler = Sampler::interpolated();
        sampler.add_sample(0.0, SamplerValue::linear(Mat4::IDENTITY)).unwrap();
        sampler
            .add_sample(1.0, SamplerValue::linear(Mat4::from_translation(vec3(10.0, 0.0, 0.0))))
            .unwrap();
        sampler.add_sample(2.0, SamplerValue::linear(Mat4::IDENTITY)).unwrap();

        let m = sampler.get_sample(0.25).unwrap().unwrap();
        assert!((m.w_axis.x - 2.5).abs() < 1e-5);
        assert_eq!(m.x_axis, Mat4::IDENTITY.x_axis);
    }
}
