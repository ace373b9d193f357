use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::axes::{self, AxisFamily, AxisState, Conversion, ConversionParams, X_AXIS_KEYS, Y_AXIS_KEYS};
use super::export::{resolve_output, write_columns, CsvOptions};
use super::labels::*;
use super::{array_to_json, ContainerBase, DataContainer, ObjectError, ObjectOptions};
use crate::array::{ArrayData, ArrayMap, DType, LazyArray};
use crate::processing::origami_ms::{combine_chromatogram, steps_to_rows};
use crate::processing::spectra::{baseline_1d, crop_1d, linearize_1d, normalize_1d, smooth_1d};
use crate::processing::{
    find_nearest_index, BaselineMethod, CropParams, LinearizeParams, OrigamiMsMethod, ProcessingError,
    SmoothMethod,
};
use crate::store::{Metadata, StoreError, ToZarr};

/// Processing steps applied by [`SpectrumObject::process`].
///
/// Steps run in a fixed order: crop, linearize, smooth, baseline, normalize.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumProcessing {
    /// Crop bounds
    pub crop: Option<CropParams>,
    /// Linearization parameters
    pub linearize: Option<LinearizeParams>,
    /// Smoothing filter
    pub smooth: Option<SmoothMethod>,
    /// Baseline removal
    pub baseline: Option<BaselineMethod>,
    /// Scale the maximum to 1
    pub normalize: bool,
}

/// One-dimensional data object: a mass spectrum, chromatogram or mobilogram
#[derive(Debug, Clone)]
pub struct SpectrumObject {
    kind: SpectrumKind,
    name: String,
    base: ContainerBase,
    x: LazyArray,
    y: LazyArray,
    options: ObjectOptions,
    unsaved: bool,
}

impl SpectrumObject {
    /// Create an object of `kind` with default labels
    pub fn new(
        kind: SpectrumKind,
        x: impl Into<ArrayData>,
        y: impl Into<ArrayData>,
    ) -> Result<Self, ObjectError> {
        let base = ContainerBase::new(kind.default_x_label(), INTENSITY);
        Self::from_parts(
            kind,
            String::new(),
            base,
            LazyArray::loaded(x.into()),
            LazyArray::loaded(y.into()),
        )
    }

    /// Mass spectrum (`m/z (Da)` vs `Intensity`)
    pub fn mass_spectrum(x: impl Into<ArrayData>, y: impl Into<ArrayData>) -> Result<Self, ObjectError> {
        Self::new(SpectrumKind::MassSpectrum, x, y)
    }

    /// Chromatogram (`Scans` vs `Intensity`)
    pub fn chromatogram(x: impl Into<ArrayData>, y: impl Into<ArrayData>) -> Result<Self, ObjectError> {
        Self::new(SpectrumKind::Chromatogram, x, y)
    }

    /// Mobilogram (`Drift time (bins)` vs `Intensity`)
    pub fn mobilogram(x: impl Into<ArrayData>, y: impl Into<ArrayData>) -> Result<Self, ObjectError> {
        Self::new(SpectrumKind::Mobilogram, x, y)
    }

    /// Assemble an object from possibly unloaded axes and validate it
    pub(crate) fn from_parts(
        kind: SpectrumKind,
        name: String,
        base: ContainerBase,
        x: LazyArray,
        y: LazyArray,
    ) -> Result<Self, ObjectError> {
        let mut object = Self {
            kind,
            name,
            base,
            x,
            y,
            options: ObjectOptions {
                remove_zeros: kind.default_remove_zeros(),
            },
            unsaved: false,
        };
        object.refresh_label_options();
        object.check()?;
        Ok(object)
    }

    /// Set the dataset name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set both labels without converting any values
    pub fn with_labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.base.set_x_label(x_label);
        self.base.set_y_label(y_label);
        self.refresh_label_options();
        self
    }

    /// Merge metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.base.metadata_mut().extend(metadata);
        self
    }

    /// Add auxiliary arrays
    pub fn with_extra_data(mut self, extra_data: ArrayMap) -> Self {
        self.base.extra_data_mut().extend(extra_data);
        self
    }

    /// Set the instance-local options
    pub fn with_options(mut self, options: ObjectOptions) -> Self {
        self.options = options;
        self
    }

    fn refresh_label_options(&mut self) {
        let mut options: Vec<&str> = self.kind.x_label_options().to_vec();
        if !options.contains(&self.base.x_label()) {
            options.push(self.base.x_label());
        }
        let options: Vec<String> = options.into_iter().map(str::to_string).collect();
        self.base.set_x_label_options(&options);
    }

    /// Kind of spectrum
    pub fn kind(&self) -> SpectrumKind {
        self.kind
    }

    /// Instance-local options
    pub fn options(&self) -> &ObjectOptions {
        &self.options
    }

    /// Mutable instance-local options
    pub fn options_mut(&mut self) -> &mut ObjectOptions {
        &mut self.options
    }

    /// Validate the axes without loading them
    pub fn check(&self) -> Result<(), ObjectError> {
        let x_shape = self.x.shape()?;
        let y_shape = self.y.shape()?;
        for shape in [&x_shape, &y_shape] {
            if shape.len() > 1 {
                return Err(ObjectError::WrongDimensions {
                    expected: 1,
                    actual: shape.len(),
                });
            }
        }
        let x_len = x_shape.first().copied().unwrap_or(0);
        let y_len = y_shape.first().copied().unwrap_or(0);
        if x_len != y_len {
            return Err(ObjectError::LengthMismatch { x_len, y_len });
        }
        Ok(())
    }

    /// x values, loaded on first access
    pub fn x(&self) -> Result<&ArrayData, ObjectError> {
        Ok(self.x.materialize()?)
    }

    /// y values, loaded on first access
    pub fn y(&self) -> Result<&ArrayData, ObjectError> {
        Ok(self.y.materialize()?)
    }

    /// Whether both axes are in memory
    pub fn is_loaded(&self) -> bool {
        self.x.is_loaded() && self.y.is_loaded()
    }

    /// Replace both axes
    pub fn set_xy(&mut self, x: impl Into<ArrayData>, y: impl Into<ArrayData>) -> Result<&mut Self, ObjectError> {
        let (x, y) = (x.into(), y.into());
        if x.len() != y.len() {
            return Err(ObjectError::LengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        self.x.replace(x);
        self.y.replace(y);
        self.unsaved = true;
        Ok(self)
    }

    /// Shape of the y axis
    pub fn shape(&self) -> Result<Vec<usize>, ObjectError> {
        Ok(self.y.shape()?)
    }

    /// Number of points
    pub fn len(&self) -> Result<usize, ObjectError> {
        Ok(self.shape()?.first().copied().unwrap_or(0))
    }

    /// Whether the object holds no points
    pub fn is_empty(&self) -> Result<bool, ObjectError> {
        Ok(self.len()? == 0)
    }

    /// `(min, max)` of x
    pub fn x_limit(&self) -> Result<(f64, f64), ObjectError> {
        let x = self.x()?;
        x.min().zip(x.max()).ok_or(ObjectError::Empty)
    }

    /// `(min, max)` of y
    pub fn y_limit(&self) -> Result<(f64, f64), ObjectError> {
        let y = self.y()?;
        y.min().zip(y.max()).ok_or(ObjectError::Empty)
    }

    /// Point indices as an integer axis
    pub fn x_bin(&self) -> Result<ArrayData, ObjectError> {
        Ok(ArrayData::arange(self.len()?))
    }

    /// Mean spacing between neighbouring x values
    pub fn x_spacing(&self) -> Result<f64, ObjectError> {
        let x = self.x()?.values();
        if x.len() < 2 {
            return Err(ObjectError::Empty);
        }
        Ok(x.windows(2).map(|w| w[1] - w[0]).sum::<f64>() / (x.len() - 1) as f64)
    }

    /// Flat mapping of axes, labels, metadata and auxiliary arrays
    pub fn to_dict(&self) -> Result<Metadata, ObjectError> {
        let mut dict = Metadata::new();
        dict.insert("x".into(), array_to_json(self.x()?));
        dict.insert("y".into(), array_to_json(self.y()?));
        if let Ok((lo, hi)) = self.x_limit() {
            dict.insert("x_limit".into(), Value::from(vec![lo, hi]));
        }
        dict.insert("x_label".into(), Value::from(self.base.x_label()));
        dict.insert("y_label".into(), Value::from(self.base.y_label()));
        dict.extend(self.base.metadata().clone());
        for (key, data) in self.base.extra_data() {
            dict.insert(key.clone(), array_to_json(data));
        }
        Ok(dict)
    }

    /// Write `x, y` columns as delimited text and return the file written
    pub fn to_csv(&self, path: impl AsRef<Path>, options: &CsvOptions) -> Result<PathBuf, ObjectError> {
        let (path, delimiter) = resolve_output(path.as_ref(), options.delimiter);
        let (x, y) = (self.x()?, self.y()?);
        let (xs, ys): (Vec<f64>, Vec<f64>) =
            if options.remove_zeros.unwrap_or(self.options.remove_zeros) {
                x.values()
                    .iter()
                    .zip(y.values())
                    .filter(|(xv, yv)| **xv != 0.0 || **yv != 0.0)
                    .map(|(xv, yv)| (*xv, *yv))
                    .unzip()
            } else {
                (x.values().to_vec(), y.values().to_vec())
            };
        let header = [self.base.x_label().to_string(), self.base.y_label().to_string()];
        write_columns(&path, delimiter, &header, &[(x.dtype(), &xs), (y.dtype(), &ys)])?;
        Ok(path)
    }

    fn replace_axes(&mut self, x: ArrayData, y: ArrayData) {
        self.x.replace(x);
        self.y.replace(y);
        self.unsaved = true;
    }

    fn replace_y(&mut self, y: Vec<f64>) {
        self.y.replace(ArrayData::from_vec(y));
        self.unsaved = true;
    }

    /// Keep the points with `x` inside the bounds
    pub fn crop(&mut self, params: &CropParams) -> Result<&mut Self, ObjectError> {
        let (x, y) = (self.x()?, self.y()?);
        let (x_dtype, y_dtype) = (x.dtype(), y.dtype());
        let (xs, ys) = crop_1d(x.values(), y.values(), params.min, params.max)?;
        let x = ArrayData::new(x_dtype, vec![xs.len()], xs)?;
        let y = ArrayData::new(y_dtype, vec![ys.len()], ys)?;
        axes::clear_axis_cache(self.base.extra_data_mut(), "x");
        self.replace_axes(x, y);
        Ok(self)
    }

    /// Place the signal on a regular axis
    pub fn linearize(&mut self, params: &LinearizeParams) -> Result<&mut Self, ObjectError> {
        let (xs, ys) = linearize_1d(self.x()?.values(), self.y()?.values(), params)?;
        axes::clear_axis_cache(self.base.extra_data_mut(), "x");
        self.replace_axes(ArrayData::from_vec(xs), ArrayData::from_vec(ys));
        Ok(self)
    }

    /// Smooth the intensities
    pub fn smooth(&mut self, method: &SmoothMethod) -> Result<&mut Self, ObjectError> {
        let y = smooth_1d(self.y()?.values(), method)?;
        self.replace_y(y);
        Ok(self)
    }

    /// Remove the baseline
    pub fn baseline(&mut self, method: &BaselineMethod) -> Result<&mut Self, ObjectError> {
        let y = baseline_1d(self.y()?.values(), method)?;
        self.replace_y(y);
        Ok(self)
    }

    /// Scale the intensities so the maximum is 1
    pub fn normalize(&mut self) -> Result<&mut Self, ObjectError> {
        let y = normalize_1d(self.y()?.values());
        self.replace_y(y);
        Ok(self)
    }

    /// Divide the intensities by `divider`
    pub fn divide(&mut self, divider: f64) -> Result<&mut Self, ObjectError> {
        if divider == 0.0 || !divider.is_finite() {
            return Err(ProcessingError::invalid("divider", format!("cannot divide by {divider}")).into());
        }
        let y: Vec<f64> = self.y()?.values().iter().map(|v| v / divider).collect();
        self.replace_y(y);
        Ok(self)
    }

    /// Run the selected steps in order: crop, linearize, smooth, baseline, normalize
    pub fn process(&mut self, steps: &SpectrumProcessing) -> Result<&mut Self, ObjectError> {
        if let Some(params) = &steps.crop {
            self.crop(params)?;
        }
        if let Some(params) = &steps.linearize {
            self.linearize(params)?;
        }
        if let Some(method) = &steps.smooth {
            self.smooth(method)?;
        }
        if let Some(method) = &steps.baseline {
            self.baseline(method)?;
        }
        if steps.normalize {
            self.normalize()?;
        }
        Ok(self)
    }

    /// Points with `x` in `[x_min, x_max]`, leaving the object untouched
    pub fn get_x_window(&self, x_min: f64, x_max: f64) -> Result<(Vec<f64>, Vec<f64>), ObjectError> {
        Ok(crop_1d(self.x()?.values(), self.y()?.values(), Some(x_min), Some(x_max))?)
    }

    fn nearest_slice(&self, x_min: f64, x_max: f64) -> Result<(&[f64], &[f64]), ObjectError> {
        let (x, y) = (self.x()?.values(), self.y()?.values());
        if x.is_empty() {
            return Err(ObjectError::Empty);
        }
        let lo = find_nearest_index(x, x_min);
        let hi = find_nearest_index(x, x_max);
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        Ok((&x[lo..=hi], &y[lo..=hi]))
    }

    /// Maximum intensity between the nearest points to `x_min` and `x_max`
    pub fn get_y_at_loc(&self, x_min: f64, x_max: f64) -> Result<f64, ObjectError> {
        let (_, y) = self.nearest_slice(x_min, x_max)?;
        Ok(y.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    /// Position and value of the most intense point in a region
    pub fn get_x_at_loc(&self, x_min: f64, x_max: f64) -> Result<(f64, f64), ObjectError> {
        let (x, y) = self.nearest_slice(x_min, x_max)?;
        let (idx, max) = y
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        Ok((x[idx], max))
    }

    /// Position and value of the most intense point
    pub fn get_x_at_max(&self) -> Result<(f64, f64), ObjectError> {
        let (lo, hi) = self.x_limit()?;
        self.get_x_at_loc(lo, hi)
    }

    fn x_families(&self) -> &'static [AxisFamily] {
        match self.kind {
            SpectrumKind::MassSpectrum => &[],
            SpectrumKind::Chromatogram => &[AxisFamily::RetentionTime, AxisFamily::CollisionEnergy],
            SpectrumKind::Mobilogram => &[AxisFamily::DriftTime],
        }
    }

    fn resolve_params(&self, params: &ConversionParams) -> ConversionParams {
        ConversionParams {
            scan_time: params.scan_time.or_else(|| self.base.store_parameter("scan_time")),
            pusher_freq: params.pusher_freq.or_else(|| self.base.store_parameter("pusher_freq")),
            charge: params.charge,
        }
    }

    /// Change the x label, converting the values, and flush.
    ///
    /// Chromatograms convert between scans and minutes and between volts and
    /// electronvolts; mobilograms between drift bins and milliseconds. Mass
    /// spectra only accept their current label.
    pub fn change_x_label(&mut self, to_label: &str, params: &ConversionParams) -> Result<&mut Self, ObjectError> {
        let params = self.resolve_params(params);
        let families = self.x_families();
        let options = self.base.x_label_options();
        let values = self.x.materialize()?;
        let state = AxisState {
            label: &self.base.x_label,
            values,
            options: &options,
            metadata: &mut self.base.metadata,
            extra_data: &mut self.base.extra_data,
        };
        match axes::change_axis(state, to_label, families, &X_AXIS_KEYS, &params)? {
            Conversion::Unchanged => Ok(self),
            Conversion::Converted { label, values } => {
                self.base.set_x_label(label);
                self.x.replace(values);
                self.unsaved = true;
                self.flush()?;
                Ok(self)
            }
        }
    }

    /// Intensity axes have no alternative units; only the current label is accepted
    pub fn change_y_label(&mut self, to_label: &str, params: &ConversionParams) -> Result<&mut Self, ObjectError> {
        let options = self.base.y_label_options();
        let values = self.y.materialize()?;
        let state = AxisState {
            label: &self.base.y_label,
            values,
            options: &options,
            metadata: &mut self.base.metadata,
            extra_data: &mut self.base.extra_data,
        };
        match axes::change_axis(state, to_label, &[], &Y_AXIS_KEYS, params)? {
            Conversion::Unchanged => Ok(self),
            Conversion::Converted { label, values } => {
                self.base.set_y_label(label);
                self.y.replace(values);
                self.unsaved = true;
                self.flush()?;
                Ok(self)
            }
        }
    }

    /// Collapse an ORIGAMI-MS chromatogram onto its collision-voltage steps.
    ///
    /// Minute axes are converted back to scans first. Without an explicit method the
    /// owning document's `origami_ms` configuration is used.
    pub fn apply_origami_ms(&mut self, method: Option<OrigamiMsMethod>) -> Result<&mut Self, ObjectError> {
        if self.kind != SpectrumKind::Chromatogram {
            return Err(ObjectError::UnsupportedOperation {
                operation: "apply_origami_ms",
                class: self.kind.class_name(),
            });
        }
        let label = self.base.x_label().to_string();
        if VOLTAGE_LABELS.contains(&label.as_str()) || ENERGY_LABELS.contains(&label.as_str()) {
            warn!("Dataset already has {label} labels");
            return Ok(self);
        }
        if MINUTE_LABELS.contains(&label.as_str()) {
            self.change_x_label(SCANS, &ConversionParams::default())?;
        } else if label != SCANS {
            return Err(ObjectError::UnsupportedConversion {
                from: label,
                to: COLLISION_VOLTAGE.to_string(),
            });
        }
        let method = match method {
            Some(method) => method,
            None => configured_origami_ms(&self.base)?,
        };

        let reduction = combine_chromatogram(self.y()?.values(), &method)?;
        let rows = steps_to_rows(&reduction.steps);
        let steps = ArrayData::new(DType::Float64, vec![reduction.steps.len(), 3], rows)?;
        axes::clear_axis_cache(self.base.extra_data_mut(), "x");
        self.base.extra_data_mut().insert("oms_ss_es_cv".into(), steps);
        self.base
            .metadata_mut()
            .insert("origami_ms".into(), serde_json::to_value(&method)?);
        self.base.set_x_label(COLLISION_VOLTAGE);
        self.replace_axes(
            ArrayData::from_vec(reduction.voltages),
            ArrayData::from_vec(reduction.data),
        );
        let title = self.title().map(|t| format!("{t} [CIU]"));
        if let Some(title) = title {
            self.set_title(&title);
        }
        self.flush()?;
        Ok(self)
    }

    /// Detached deep copy with every axis in memory
    pub fn duplicate(&self) -> Result<Self, ObjectError> {
        let mut copy = self.clone();
        copy.x = LazyArray::loaded(self.x()?.clone());
        copy.y = LazyArray::loaded(self.y()?.clone());
        copy.base.set_owner(None);
        Ok(copy)
    }
}

/// ORIGAMI-MS method from the owning document's configuration
pub(crate) fn configured_origami_ms(base: &ContainerBase) -> Result<OrigamiMsMethod, ObjectError> {
    let store = base
        .owner()
        .and_then(|owner| owner.store())
        .ok_or(ObjectError::MissingParameter("origami_ms"))?;
    store
        .get_config_as::<OrigamiMsMethod>("origami_ms")?
        .ok_or(ObjectError::MissingParameter("origami_ms"))
}

impl ToZarr for SpectrumObject {
    fn to_zarr(&self) -> Result<(ArrayMap, Metadata), StoreError> {
        let mut data = self.base.extra_data().clone();
        data.insert("x".into(), self.x.materialize()?.clone());
        data.insert("y".into(), self.y.materialize()?.clone());
        Ok((data, self.to_attrs()))
    }
}

impl DataContainer for SpectrumObject {
    fn base(&self) -> &ContainerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ContainerBase {
        &mut self.base
    }

    fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    fn document_key(&self) -> &'static str {
        self.kind.document_key()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn is_unsaved(&self) -> bool {
        self.unsaved
    }

    fn set_unsaved(&mut self, unsaved: bool) {
        self.unsaved = unsaved;
    }

    fn to_attrs(&self) -> Metadata {
        let mut attrs = self.base.metadata().clone();
        attrs.insert("class".into(), Value::from(self.class_name()));
        if let Ok((lo, hi)) = self.x_limit() {
            attrs.insert("x_limit".into(), Value::from(vec![lo, hi]));
        }
        attrs.insert("x_label".into(), Value::from(self.base.x_label()));
        attrs.insert("y_label".into(), Value::from(self.base.y_label()));
        attrs
    }
}
