// src/engine/transform.rs
//
// The opaque model capability the engine drives.

use crate::engine::image::Image;
pub use crate::error::BoxError;
use crate::ops::Normalization;

/// `Transform(tile) -> tile'`: one inference call on one tile.
///
/// Implementations that wrap a single accelerator context are expected to
/// serialize internally; the executor only ever calls `transform` from the
/// thread driving the run.
///
/// The call is synchronous. A host whose model runs asynchronously must block
/// on it inside `transform` (e.g. through its runtime's `block_on`); the run
/// is suspended for the duration of each call.
/// Cancellation is observed between calls, never during one.
pub trait TileTransform {
    /// Run the model on `tile`, whose samples are already in
    /// `input_normalization()` range.
    fn transform(&self, tile: Image) -> Result<Image, BoxError>;

    /// Range the model expects its input samples in.
    fn input_normalization(&self) -> Normalization {
        Normalization::ZeroToOne
    }

    /// Range the model produces its output samples in.
    fn output_normalization(&self) -> Normalization {
        Normalization::ZeroToOne
    }
}

impl<F> TileTransform for F
where
    F: Fn(Image) -> Result<Image, BoxError>,
{
    fn transform(&self, tile: Image) -> Result<Image, BoxError> {
        self(tile)
    }
}

/// Strategy object pairing an inference function with its value ranges.
///
/// Defaults follow the usual image-model convention: input in `[0, 1]`
/// (`ZeroToOne`), output in `[-1, 1]` (`OneToOne`). Plain closures used as a
/// [`TileTransform`] stay `ZeroToOne` on both sides.
///
/// ```
/// use tiled_transform::engine::{Image, ModelTransform};
/// use tiled_transform::ops::Normalization;
///
/// let model = ModelTransform::new(|tile: Image| Ok(tile))
///     .with_input_normalization(Normalization::OneToOne)
///     .with_output_normalization(Normalization::OneToOne);
/// # let _ = model;
/// ```
#[derive(Clone, Debug)]
pub struct ModelTransform<F> {
    apply: F,
    input: Normalization,
    output: Normalization,
}

impl<F> ModelTransform<F>
where
    F: Fn(Image) -> Result<Image, BoxError>,
{
    pub fn new(apply: F) -> Self {
        Self {
            apply,
            input: Normalization::ZeroToOne,
            output: Normalization::OneToOne,
        }
    }

    pub fn with_input_normalization(mut self, normalization: Normalization) -> Self {
        self.input = normalization;
        self
    }

    pub fn with_output_normalization(mut self, normalization: Normalization) -> Self {
        self.output = normalization;
        self
    }
}

impl<F> TileTransform for ModelTransform<F>
where
    F: Fn(Image) -> Result<Image, BoxError>,
{
    fn transform(&self, tile: Image) -> Result<Image, BoxError> {
        (self.apply)(tile)
    }

    fn input_normalization(&self) -> Normalization {
        self.input
    }

    fn output_normalization(&self) -> Normalization {
        self.output
    }
}

/// Map engine samples into the transform's input range.
pub(crate) fn prepare_input<T: TileTransform + ?Sized>(transform: &T, tile: Image) -> Image {
    match transform.input_normalization() {
        Normalization::ZeroToOne => tile,
        n => tile.map_samples(|v| n.normalize(v)),
    }
}

/// Map transform output back into `[0, 1]`.
pub(crate) fn restore_output<T: TileTransform + ?Sized>(transform: &T, tile: Image) -> Image {
    let n = transform.output_normalization();
    tile.map_samples(|v| n.denormalize(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_transform() {
        let double = |tile: Image| -> Result<Image, BoxError> { Ok(tile.map_samples(|v| v * 2.0)) };
        let out = double.transform(Image::filled(2, 2, 1, 0.25).unwrap()).unwrap();
        assert_eq!(out.pixel(1, 1), &[0.5]);
        assert_eq!(double.input_normalization(), Normalization::ZeroToOne);
    }

    #[test]
    fn test_model_transform_round_trips_one_to_one() {
        let model = ModelTransform::new(|tile: Image| Ok(tile))
            .with_input_normalization(Normalization::OneToOne)
            .with_output_normalization(Normalization::OneToOne);
        let tile = Image::from_fn(4, 1, 1, |x, _, _| x as f32 / 4.0).unwrap();
        let prepared = prepare_input(&model, tile.clone());
        assert_eq!(prepared.pixel(0, 0), &[-1.0]);
        let restored = restore_output(&model, model.transform(prepared).unwrap());
        for (a, b) in restored.data().iter().zip(tile.data()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_model_transform_defaults() {
        let model = ModelTransform::new(|tile: Image| Ok(tile));
        assert_eq!(model.input_normalization(), Normalization::ZeroToOne);
        assert_eq!(model.output_normalization(), Normalization::OneToOne);

        let produced = Image::from_raw(1, 3, 1, vec![-1.0, 0.0, 1.0]).unwrap();
        let restored = restore_output(&model, produced);
        assert_eq!(restored.data(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_restore_clamps_overshoot() {
        let model = ModelTransform::new(|tile: Image| Ok(tile.map_samples(|v| v + 0.8)));
        let tile = Image::filled(1, 1, 1, 0.5).unwrap();
        let out = restore_output(&model, model.transform(tile).unwrap());
        assert_eq!(out.pixel(0, 0), &[1.0]);
    }

    #[test]
    fn test_errors_pass_through() {
        let failing = |_: Image| -> Result<Image, BoxError> { Err("out of memory".into()) };
        let err = failing.transform(Image::new(1, 1, 3).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "out of memory");
    }
}
