use log::debug;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{DataGroup, DataObjectsContainer, GroupCore, GroupError};
use crate::array::ArrayData;
use crate::objects::labels::INTENSITY;
use crate::objects::{ContainerBase, DataObject, SpectrumKind, SpectrumObject};
use crate::processing::spectra::linearize_1d;
use crate::processing::{LinearizeMethod, LinearizeParams, ProcessingDefaults};

/// Parameters of [`SpectrumGroup::resample`]; unset values fall back to the last
/// resample, then to the group's data range and [`ProcessingDefaults`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleParams {
    /// Lower bound of the common axis
    pub x_min: Option<f64>,
    /// Upper bound of the common axis
    pub x_max: Option<f64>,
    /// Spacing of the common axis
    pub bin_size: Option<f64>,
    /// Linearization method
    pub linearization_mode: Option<LinearizeMethod>,
    /// Recorded with the step; the bounds above are always used
    pub auto_range: bool,
    /// Constant relative spacing in parts per million
    pub ppm: Option<f64>,
}

#[derive(Debug, Clone, Default)]
struct Aggregates {
    x: Option<Vec<f64>>,
    y_sum: Option<Vec<f64>>,
    y_mean: Option<Vec<f64>>,
    x_range: Option<(f64, f64)>,
}

/// Group of mass spectra, chromatograms or mobilograms
#[derive(Debug, Clone)]
pub struct SpectrumGroup {
    kind: SpectrumKind,
    core: GroupCore,
    defaults: ProcessingDefaults,
    resample: bool,
    cache: Aggregates,
}

impl SpectrumGroup {
    /// Group of `kind` with the kind's default labels and options
    pub fn new(kind: SpectrumKind, members: DataObjectsContainer) -> Self {
        let mut base = ContainerBase::new(kind.default_x_label(), INTENSITY);
        base.set_x_label_options(kind.x_label_options());
        base.set_y_label_options(&[INTENSITY]);
        Self {
            kind,
            core: GroupCore::new(members, base),
            defaults: ProcessingDefaults::default(),
            resample: true,
            cache: Aggregates::default(),
        }
    }

    /// Group of mass spectra
    pub fn mass_spectra(members: DataObjectsContainer) -> Self {
        Self::new(SpectrumKind::MassSpectrum, members)
    }

    /// Group of chromatograms
    pub fn chromatograms(members: DataObjectsContainer) -> Self {
        Self::new(SpectrumKind::Chromatogram, members)
    }

    /// Group of mobilograms
    pub fn mobilograms(members: DataObjectsContainer) -> Self {
        Self::new(SpectrumKind::Mobilogram, members)
    }

    /// Use `defaults` for unset resample parameters
    pub fn with_defaults(mut self, defaults: ProcessingDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Kind of the members
    pub fn kind(&self) -> SpectrumKind {
        self.kind
    }

    /// Every member as a spectrum, loading lazy members first
    pub fn spectra(&mut self) -> Result<Vec<&SpectrumObject>, GroupError> {
        let class = self.class_name();
        self.core
            .objects()?
            .into_iter()
            .map(|object| match object {
                DataObject::Spectrum(s) => Ok(s),
                DataObject::Heatmap(h) => Err(GroupError::WrongMember {
                    expected: class,
                    actual: crate::objects::DataContainer::class_name(h),
                }),
            })
            .collect()
    }

    /// Every member's x values
    pub fn xs(&mut self) -> Result<Vec<Vec<f64>>, GroupError> {
        self.spectra()?
            .iter()
            .map(|s| Ok(s.x()?.values().to_vec()))
            .collect()
    }

    /// Every member's intensities
    pub fn ys(&mut self) -> Result<Vec<Vec<f64>>, GroupError> {
        self.spectra()?
            .iter()
            .map(|s| Ok(s.y()?.values().to_vec()))
            .collect()
    }

    /// Union of the members' x ranges.
    ///
    /// Members whose first and last x values all agree do not need resampling.
    pub fn get_x_range(&mut self) -> Result<(f64, f64), GroupError> {
        if let Some(range) = self.cache.x_range {
            return Ok(range);
        }
        let mut firsts = Vec::new();
        let mut lasts = Vec::new();
        for spectrum in self.spectra()? {
            let x = spectrum.x()?.values();
            let (Some(first), Some(last)) = (x.first(), x.last()) else {
                return Err(GroupError::Incompatible("a member has no data".into()));
            };
            firsts.push(*first);
            lasts.push(*last);
        }
        if firsts.is_empty() {
            return Err(GroupError::Empty);
        }
        let same = |values: &[f64]| values.windows(2).all(|w| w[0] == w[1]);
        self.resample = !(same(&firsts) && same(&lasts));
        let range = (
            firsts.iter().copied().fold(f64::INFINITY, f64::min),
            lasts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        );
        self.cache.x_range = Some(range);
        Ok(range)
    }

    /// `(min, max)` of the common x axis
    pub fn x_limit(&mut self) -> Result<(f64, f64), GroupError> {
        self.get_x_range()
    }

    /// Put every member on a common x axis.
    ///
    /// Returns the axis and a `(members, points)` array of intensities. Members that
    /// already share their range are passed through unchanged.
    pub fn resample(&mut self, params: &ResampleParams) -> Result<(Vec<f64>, Array2<f64>), GroupError> {
        let previous: ResampleParams = match self.get_processing_step("resample") {
            Some(value) => serde_json::from_value(value.clone())?,
            None => ResampleParams::default(),
        };
        let (range_min, range_max) = self.get_x_range()?;
        let resolved = ResampleParams {
            x_min: Some(params.x_min.or(previous.x_min).unwrap_or(range_min)),
            x_max: Some(params.x_max.or(previous.x_max).unwrap_or(range_max)),
            bin_size: Some(
                params
                    .bin_size
                    .or(previous.bin_size)
                    .unwrap_or_else(|| self.defaults.bin_size(self.kind)),
            ),
            linearization_mode: Some(
                params
                    .linearization_mode
                    .or(previous.linearization_mode)
                    .unwrap_or(self.defaults.linearize_method),
            ),
            auto_range: params.auto_range,
            ppm: params.ppm.or(previous.ppm),
        };
        let linearize = LinearizeParams {
            method: resolved.linearization_mode.unwrap_or_default(),
            bin_size: resolved.bin_size.unwrap_or(self.defaults.mz_bin_size),
            auto_range: false,
            x_min: resolved.x_min,
            x_max: resolved.x_max,
            ppm: resolved.ppm,
        };

        let need_resample = self.resample;
        let mut x = Vec::new();
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for spectrum in self.spectra()? {
            let (sx, sy) = if need_resample {
                linearize_1d(spectrum.x()?.values(), spectrum.y()?.values(), &linearize)?
            } else {
                (spectrum.x()?.values().to_vec(), spectrum.y()?.values().to_vec())
            };
            if rows.is_empty() {
                x = sx;
            } else if sy.len() != x.len() {
                return Err(GroupError::Incompatible(format!(
                    "member has {} points, expected {}",
                    sy.len(),
                    x.len()
                )));
            }
            rows.push(sy);
        }
        let n_points = x.len();
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let ys = Array2::from_shape_vec((rows.len(), n_points), flat)
            .map_err(|e| GroupError::Incompatible(e.to_string()))?;

        if need_resample {
            let changed = self.add_processing_step("resample", serde_json::to_value(resolved)?);
            debug!("Resampled {} members onto {n_points} points (new parameters: {changed})", rows.len());
        }
        Ok((x, ys))
    }

    fn combine(
        &mut self,
        params: &ResampleParams,
        reduce: fn(&Array2<f64>) -> Vec<f64>,
    ) -> Result<(Vec<f64>, Vec<f64>), GroupError> {
        let (x, ys) = self.resample(params)?;
        if ys.nrows() == 0 {
            return Err(GroupError::Empty);
        }
        Ok((x, reduce(&ys)))
    }

    fn wrap(&self, x: Vec<f64>, y: Vec<f64>) -> Result<SpectrumObject, GroupError> {
        let x_label = self.core.base().x_label().to_string();
        Ok(SpectrumObject::new(self.kind, ArrayData::from_vec(x), ArrayData::from_vec(y))?
            .with_labels(x_label, INTENSITY))
    }

    /// Sum of the resampled members as a spectrum of the group's kind
    pub fn sum(&mut self, params: &ResampleParams) -> Result<SpectrumObject, GroupError> {
        let (x, y) = self.combine(params, |ys| ys.sum_axis(Axis(0)).to_vec())?;
        self.cache.x = Some(x.clone());
        self.cache.y_sum = Some(y.clone());
        self.wrap(x, y)
    }

    /// Mean of the resampled members as a spectrum of the group's kind
    pub fn mean(&mut self, params: &ResampleParams) -> Result<SpectrumObject, GroupError> {
        let (x, y) = self.combine(params, |ys| {
            ys.mean_axis(Axis(0)).map(|m| m.to_vec()).unwrap_or_default()
        })?;
        self.cache.x = Some(x.clone());
        self.cache.y_mean = Some(y.clone());
        self.wrap(x, y)
    }

    /// Common x axis, computed with the last resample parameters if needed
    pub fn x(&mut self) -> Result<&[f64], GroupError> {
        if self.cache.x.is_none() {
            self.sum(&ResampleParams::default())?;
        }
        Ok(self.cache.x.as_deref().unwrap_or_default())
    }

    /// Summed intensities, cached until the resample parameters change
    pub fn y_sum(&mut self) -> Result<&[f64], GroupError> {
        if self.cache.y_sum.is_none() {
            self.sum(&ResampleParams::default())?;
        }
        Ok(self.cache.y_sum.as_deref().unwrap_or_default())
    }

    /// Mean intensities, cached until the resample parameters change
    pub fn y_mean(&mut self) -> Result<&[f64], GroupError> {
        if self.cache.y_mean.is_none() {
            self.mean(&ResampleParams::default())?;
        }
        Ok(self.cache.y_mean.as_deref().unwrap_or_default())
    }

    /// Whether a summed spectrum is cached
    pub fn has_cached_sum(&self) -> bool {
        self.cache.y_sum.is_some()
    }
}

impl DataGroup for SpectrumGroup {
    fn core(&self) -> &GroupCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut GroupCore {
        &mut self.core
    }

    fn class_name(&self) -> &'static str {
        match self.kind {
            SpectrumKind::MassSpectrum => "MassSpectrumGroup",
            SpectrumKind::Chromatogram => "ChromatogramGroup",
            SpectrumKind::Mobilogram => "MobilogramGroup",
        }
    }

    fn need_resample(&mut self) -> Result<bool, GroupError> {
        self.get_x_range()?;
        Ok(self.resample)
    }

    fn reset(&mut self) {
        self.cache = Aggregates::default();
    }
}
