//! The toggleable scanner-look filter pipeline.
//!
//! A [`FilterPipeline`] holds one [`Filter`] per [`FilterKind`] in a fixed
//! order: grayscale, noise, blur, random rotate, autocontrast. Each filter
//! carries an enabled flag and, for the kinds that take one, a strength
//! validated against the kind's range when it is set.

use std::fmt;
use std::str::FromStr;

use image::DynamicImage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{ComposeError, ScannerConfig};

/// The image transforms available to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Convert to single-channel luminance.
    Grayscale,
    /// Salt noise; strength is a per-mille density.
    Noise,
    /// Gaussian blur; strength is sigma.
    Blur,
    /// Random rotation; strength is the maximum angle in degrees.
    RandomRotate,
    /// Histogram stretch; strength is the cutoff in percent.
    #[serde(rename = "autocontrast")]
    AutoContrast,
}

impl FilterKind {
    /// Every kind, in pipeline order.
    pub const DECLARED_ORDER: [Self; 5] = [
        Self::Grayscale,
        Self::Noise,
        Self::Blur,
        Self::RandomRotate,
        Self::AutoContrast,
    ];

    /// Stable identifier, as used in JSON configs and on the command line.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Noise => "noise",
            Self::Blur => "blur",
            Self::RandomRotate => "random_rotate",
            Self::AutoContrast => "autocontrast",
        }
    }

    /// Human-readable label for a filter control.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grayscale => "Grayscale",
            Self::Noise => "Noise",
            Self::Blur => "Blur",
            Self::RandomRotate => "Random rotate",
            Self::AutoContrast => "Autocontrast cutoff",
        }
    }

    /// Inclusive range accepted by [`Filter::set_strength`], or `None`
    /// when the kind takes no strength.
    #[must_use]
    pub const fn strength_range(self) -> Option<(f32, f32)> {
        match self {
            Self::Grayscale => None,
            Self::Noise => Some((0.0, 1.0)),
            Self::Blur => Some((0.0, 5.0)),
            Self::RandomRotate => Some((0.0, 10.0)),
            Self::AutoContrast => Some((0.0, 45.0)),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error returned when a string names no [`FilterKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter {0:?} (expected one of grayscale, noise, blur, random_rotate, autocontrast)")]
pub struct ParseFilterKindError(pub String);

impl FromStr for FilterKind {
    type Err = ParseFilterKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::DECLARED_ORDER
            .into_iter()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| ParseFilterKindError(s.to_owned()))
    }
}

/// Serializable state of one filter, as found in [`ScannerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSetting {
    /// Which filter this setting targets.
    pub kind: FilterKind,
    /// Whether the filter runs.
    pub enabled: bool,
    /// New strength, if any. Omitted keeps the current strength.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

impl FilterSetting {
    /// Create a setting.
    #[must_use]
    pub const fn new(kind: FilterKind, enabled: bool, strength: Option<f32>) -> Self {
        Self {
            kind,
            enabled,
            strength,
        }
    }
}

/// One step of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    kind: FilterKind,
    enabled: bool,
    strength: Option<f32>,
}

impl Filter {
    /// Create a filter. The initial strength is trusted and not range
    /// checked.
    #[must_use]
    pub const fn new(kind: FilterKind, enabled: bool, strength: Option<f32>) -> Self {
        Self {
            kind,
            enabled,
            strength,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        self.kind
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn strength(&self) -> Option<f32> {
        self.strength
    }

    #[must_use]
    pub const fn strength_range(&self) -> Option<(f32, f32)> {
        self.kind.strength_range()
    }

    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Set the strength.
    ///
    /// # Errors
    ///
    /// [`ComposeError::NoStrength`] if the kind takes no strength, and
    /// [`ComposeError::StrengthOutOfRange`] if `value` lies outside the
    /// kind's range (NaN included).
    pub fn set_strength(&mut self, value: f32) -> Result<(), ComposeError> {
        let Some((min, max)) = self.strength_range() else {
            return Err(ComposeError::NoStrength { filter: self.kind });
        };
        if !(min..=max).contains(&value) {
            return Err(ComposeError::StrengthOutOfRange {
                filter: self.kind,
                value,
                min,
                max,
            });
        }
        self.strength = Some(value);
        Ok(())
    }

    /// Snapshot as a [`FilterSetting`].
    #[must_use]
    pub const fn setting(&self) -> FilterSetting {
        FilterSetting::new(self.kind, self.enabled, self.strength)
    }

    /// Run the filter. A disabled filter returns `image` untouched, as
    /// does a strength-taking filter whose strength is unset.
    #[must_use = "returns the filtered image"]
    pub fn apply<R: Rng + ?Sized>(&self, image: DynamicImage, rng: &mut R) -> DynamicImage {
        if !self.enabled {
            return image;
        }
        match (self.kind, self.strength) {
            (FilterKind::Grayscale, _) => crate::grayscale::grayscale(image),
            (_, None) => image,
            (FilterKind::Noise, Some(s)) => crate::noise::salt_noise(image, s, rng),
            (FilterKind::Blur, Some(s)) => crate::blur::gaussian_blur(image, s),
            (FilterKind::RandomRotate, Some(s)) => crate::rotate::random_rotate(image, s, rng),
            (FilterKind::AutoContrast, Some(s)) => crate::contrast::autocontrast(image, s),
        }
    }
}

/// Ordered filters applied to preview and export renders.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPipeline {
    filters: Vec<Filter>,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self {
            filters: vec![
                Filter::new(FilterKind::Grayscale, true, None),
                Filter::new(
                    FilterKind::Noise,
                    false,
                    Some(ScannerConfig::DEFAULT_NOISE_STRENGTH),
                ),
                Filter::new(
                    FilterKind::Blur,
                    false,
                    Some(ScannerConfig::DEFAULT_BLUR_STRENGTH),
                ),
                Filter::new(
                    FilterKind::RandomRotate,
                    true,
                    Some(ScannerConfig::DEFAULT_ROTATE_STRENGTH),
                ),
                Filter::new(
                    FilterKind::AutoContrast,
                    true,
                    Some(ScannerConfig::DEFAULT_AUTOCONTRAST_STRENGTH),
                ),
            ],
        }
    }
}

impl FilterPipeline {
    /// Filters in application order.
    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }

    #[must_use]
    pub fn filter(&self, kind: FilterKind) -> Option<&Filter> {
        self.filters.iter().find(|f| f.kind == kind)
    }

    pub fn filter_mut(&mut self, kind: FilterKind) -> Option<&mut Filter> {
        self.filters.iter_mut().find(|f| f.kind == kind)
    }

    /// Current state of every filter, in order.
    #[must_use]
    pub fn settings(&self) -> Vec<FilterSetting> {
        self.filters.iter().map(Filter::setting).collect()
    }

    /// Apply a batch of settings. Either all of them take effect or, on
    /// error, none do.
    ///
    /// # Errors
    ///
    /// Propagates the first [`Filter::set_strength`] failure.
    pub fn apply_settings(&mut self, settings: &[FilterSetting]) -> Result<(), ComposeError> {
        let mut next = self.clone();
        for setting in settings {
            let Some(filter) = next.filter_mut(setting.kind) else {
                continue;
            };
            filter.set_enabled(setting.enabled);
            if let Some(strength) = setting.strength {
                filter.set_strength(strength)?;
            }
        }
        *self = next;
        Ok(())
    }

    /// Thread `image` through every filter in order.
    #[must_use = "returns the filtered image"]
    pub fn apply<R: Rng + ?Sized>(&self, image: DynamicImage, rng: &mut R) -> DynamicImage {
        self.filters
            .iter()
            .fold(image, |image, filter| filter.apply(image, rng))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn gradient() -> DynamicImage {
        #[allow(clippy::cast_possible_truncation)]
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(24, 16, |x, y| {
            image::Rgb([(x * 10) as u8, (y * 15) as u8, 200])
        }))
    }

    fn all_disabled() -> FilterPipeline {
        let mut pipeline = FilterPipeline::default();
        for kind in FilterKind::DECLARED_ORDER {
            pipeline.filter_mut(kind).unwrap().set_enabled(false);
        }
        pipeline
    }

    #[test]
    fn default_order_and_state() {
        let pipeline = FilterPipeline::default();
        let kinds: Vec<FilterKind> = pipeline.iter().map(Filter::kind).collect();
        assert_eq!(kinds, FilterKind::DECLARED_ORDER.to_vec());
        assert_eq!(pipeline.settings(), ScannerConfig::default().filters);
    }

    #[test]
    fn disabled_filter_is_identity() {
        let mut rng = StdRng::seed_from_u64(0);
        for kind in FilterKind::DECLARED_ORDER {
            let filter = Filter::new(kind, false, kind.strength_range().map(|(_, max)| max));
            let img = gradient();
            assert_eq!(filter.apply(img.clone(), &mut rng), img, "{kind} changed the image");
        }
    }

    #[test]
    fn all_disabled_pipeline_is_identity() {
        let img = gradient();
        let out = all_disabled().apply(img.clone(), &mut StdRng::seed_from_u64(0));
        assert_eq!(out, img);
    }

    #[test]
    fn enabled_grayscale_yields_one_channel() {
        let mut pipeline = all_disabled();
        pipeline
            .filter_mut(FilterKind::Grayscale)
            .unwrap()
            .set_enabled(true);
        let out = pipeline.apply(gradient(), &mut StdRng::seed_from_u64(0));
        assert_eq!(out.color().channel_count(), 1);
    }

    #[test]
    fn default_pipeline_is_seed_reproducible() {
        let pipeline = FilterPipeline::default();
        let a = pipeline.apply(gradient(), &mut StdRng::seed_from_u64(5));
        let b = pipeline.apply(gradient(), &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
        assert_eq!((a.width(), a.height()), (24, 16));
    }

    #[test]
    fn strength_outside_range_is_rejected() {
        let mut pipeline = FilterPipeline::default();
        let blur = pipeline.filter_mut(FilterKind::Blur).unwrap();
        let err = blur.set_strength(6.0).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::StrengthOutOfRange {
                filter: FilterKind::Blur,
                ..
            }
        ));
        assert!(blur.set_strength(f32::NAN).is_err());
        assert_eq!(blur.strength(), Some(1.0));

        blur.set_strength(5.0).unwrap();
        assert_eq!(blur.strength(), Some(5.0));
    }

    #[test]
    fn grayscale_takes_no_strength() {
        let mut filter = Filter::new(FilterKind::Grayscale, true, None);
        assert!(matches!(
            filter.set_strength(1.0),
            Err(ComposeError::NoStrength {
                filter: FilterKind::Grayscale
            })
        ));
    }

    #[test]
    fn unset_strength_is_identity() {
        let filter = Filter::new(FilterKind::Blur, true, None);
        let img = gradient();
        assert_eq!(filter.apply(img.clone(), &mut StdRng::seed_from_u64(0)), img);
    }

    #[test]
    fn apply_settings_is_all_or_nothing() {
        let mut pipeline = FilterPipeline::default();
        let before = pipeline.clone();
        let result = pipeline.apply_settings(&[
            FilterSetting::new(FilterKind::Noise, true, Some(0.5)),
            FilterSetting::new(FilterKind::RandomRotate, true, Some(99.0)),
        ]);
        assert!(result.is_err());
        assert_eq!(pipeline, before);

        pipeline
            .apply_settings(&[FilterSetting::new(FilterKind::Noise, true, Some(0.5))])
            .unwrap();
        let noise = pipeline.filter(FilterKind::Noise).unwrap();
        assert!(noise.enabled());
        assert_eq!(noise.strength(), Some(0.5));
    }

    #[test]
    fn kind_parses_from_identifiers() {
        assert_eq!("random-rotate".parse::<FilterKind>(), Ok(FilterKind::RandomRotate));
        assert_eq!("AutoContrast".parse::<FilterKind>(), Ok(FilterKind::AutoContrast));
        assert!("sharpen".parse::<FilterKind>().is_err());
        for kind in FilterKind::DECLARED_ORDER {
            assert_eq!(kind.to_string().parse::<FilterKind>(), Ok(kind));
        }
    }

    #[test]
    fn setting_json_uses_identifiers() {
        let json = serde_json::to_string(&FilterSetting::new(FilterKind::RandomRotate, true, None))
            .unwrap();
        assert_eq!(json, r#"{"kind":"random_rotate","enabled":true}"#);

        let parsed: FilterSetting =
            serde_json::from_str(r#"{"kind":"autocontrast","enabled":false,"strength":3}"#)
                .unwrap();
        assert_eq!(
            parsed,
            FilterSetting::new(FilterKind::AutoContrast, false, Some(3.0))
        );
    }
}
