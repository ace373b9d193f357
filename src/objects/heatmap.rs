use std::path::{Path, PathBuf};

use log::warn;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::axes::{self, AxisFamily, AxisState, Conversion, ConversionParams, X_AXIS_KEYS, Y_AXIS_KEYS};
use super::export::{resolve_output, write_columns, write_rows, CsvOptions};
use super::labels::*;
use super::spectrum::configured_origami_ms;
use super::{array_to_json, ContainerBase, DataContainer, ObjectError, SpectrumObject};
use crate::array::{ArrayData, ArrayMap, DType, LazyArray};
use crate::processing::heatmap::{
    crop_2d, equalize_heatmap_spacing, interpolate_2d, normalize_2d, remove_noise_2d, smooth_2d,
    sum_column_blocks, Heatmap,
};
use crate::processing::origami_ms::{combine_heatmap, steps_to_rows};
use crate::processing::{
    nearest_range, Crop2dParams, Interpolate2dParams, Normalize2dMethod, OrigamiMsMethod,
    ProcessingError, SmoothMethod,
};
use crate::store::{Metadata, StoreError, ToZarr};

/// How [`HeatmapObject::downsample`] reduces the number of columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownsampleMode {
    /// Keep every n-th column
    #[default]
    #[serde(rename = "Sub-sample")]
    SubSample,
    /// Sum adjacent blocks of columns
    Summed,
}

/// Shape of a heatmap text export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeatmapExport {
    /// Full array, one row per y value, x values in the header
    #[default]
    Array,
    /// y axis against the row sums
    DriftTime,
    /// x axis against the column sums
    Retention,
}

/// Processing steps applied by [`HeatmapObject::process`].
///
/// Steps run in a fixed order: crop, interpolate, smooth, baseline, normalize.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapProcessing {
    /// Crop bounds
    pub crop: Option<Crop2dParams>,
    /// Interpolation onto a finer grid
    pub interpolate: Option<Interpolate2dParams>,
    /// Smoothing filter applied along both axes
    pub smooth: Option<SmoothMethod>,
    /// Noise threshold
    pub baseline: Option<f64>,
    /// Normalization
    pub normalize: Option<Normalize2dMethod>,
}

/// Two-dimensional data object.
///
/// The array is laid out as `(len(y), len(x))`. `xy` holds the column sums (one
/// value per x) and `yy` the row sums (one value per y); both are computed on first
/// access unless they were stored or supplied.
#[derive(Debug, Clone)]
pub struct HeatmapObject {
    kind: HeatmapKind,
    name: String,
    base: ContainerBase,
    array: LazyArray,
    x: LazyArray,
    y: LazyArray,
    xy: LazyArray,
    yy: LazyArray,
    unsaved: bool,
}

fn axis_len(shape: &[usize]) -> Option<usize> {
    match shape {
        [] => None,
        [n] => Some(*n),
        _ => Some(shape.iter().product()),
    }
}

fn with_dtype(dtype: DType, values: Vec<f64>) -> Result<ArrayData, ObjectError> {
    let len = values.len();
    Ok(ArrayData::new(dtype, vec![len], values)?)
}

impl HeatmapObject {
    /// Create a heatmap of `kind` with default labels
    pub fn new(
        kind: HeatmapKind,
        array: impl Into<ArrayData>,
        x: impl Into<ArrayData>,
        y: impl Into<ArrayData>,
    ) -> Result<Self, ObjectError> {
        Self::from_parts(
            kind,
            String::new(),
            ContainerBase::new(kind.default_x_label(), DRIFT_TIME_BINS),
            LazyArray::loaded(array.into()),
            LazyArray::loaded(x.into()),
            LazyArray::loaded(y.into()),
            LazyArray::pending(),
            LazyArray::pending(),
        )
    }

    /// Create a heatmap whose axes are the column and row indices
    pub fn from_array(kind: HeatmapKind, array: impl Into<ArrayData>) -> Result<Self, ObjectError> {
        let array = array.into();
        let (rows, cols) = match array.shape() {
            [rows, cols] => (*rows, *cols),
            shape => {
                return Err(ObjectError::WrongDimensions {
                    expected: 2,
                    actual: shape.len(),
                })
            }
        };
        Self::new(kind, array, ArrayData::arange(cols), ArrayData::arange(rows))
    }

    /// Ion heatmap (`Scans` vs `Drift time (bins)`)
    pub fn ion_heatmap(
        array: impl Into<ArrayData>,
        x: impl Into<ArrayData>,
        y: impl Into<ArrayData>,
    ) -> Result<Self, ObjectError> {
        Self::new(HeatmapKind::IonHeatmap, array, x, y)
    }

    /// MS/DT heatmap (`m/z (Da)` vs `Drift time (bins)`)
    pub fn msdt_heatmap(
        array: impl Into<ArrayData>,
        x: impl Into<ArrayData>,
        y: impl Into<ArrayData>,
    ) -> Result<Self, ObjectError> {
        Self::new(HeatmapKind::MassSpectrumHeatmap, array, x, y)
    }

    /// Build an ion heatmap from mobilograms acquired at different `variables`
    /// (e.g. collision voltages).
    ///
    /// Column `i` holds the intensities of mobilogram `i`; the y axis is taken from
    /// the first mobilogram. Unevenly spaced variables are regularized.
    pub fn stitch(mobilograms: &[SpectrumObject], variables: &[f64]) -> Result<Self, ObjectError> {
        if mobilograms.len() != variables.len() {
            return Err(ObjectError::Stitch(format!(
                "{} mobilograms but {} variables",
                mobilograms.len(),
                variables.len()
            )));
        }
        let Some(first) = mobilograms.first() else {
            return Err(ObjectError::Stitch("no mobilograms were given".into()));
        };
        let y = first.x()?.values().to_vec();
        let mut array = Array2::zeros((y.len(), mobilograms.len()));
        for (i, mobilogram) in mobilograms.iter().enumerate() {
            let values = mobilogram.y()?.values();
            if values.len() != y.len() {
                return Err(ObjectError::Stitch(format!(
                    "mobilogram {i} has {} points, expected {}",
                    values.len(),
                    y.len()
                )));
            }
            for (r, v) in values.iter().enumerate() {
                array[[r, i]] = *v;
            }
        }
        let (x, y, array) = equalize_heatmap_spacing(variables, &y, &array.view())?;
        let y = with_dtype(first.x()?.dtype(), y)?;
        let mut object = Self::new(HeatmapKind::StitchIonHeatmap, array, x, y)?;
        object.base.set_y_label(first.base().x_label());
        object.refresh_label_options();
        Ok(object)
    }

    /// Assemble an object from possibly unloaded arrays and validate it
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        kind: HeatmapKind,
        name: String,
        base: ContainerBase,
        array: LazyArray,
        x: LazyArray,
        y: LazyArray,
        xy: LazyArray,
        yy: LazyArray,
    ) -> Result<Self, ObjectError> {
        let mut object = Self {
            kind,
            name,
            base,
            array,
            x,
            y,
            xy,
            yy,
            unsaved: false,
        };
        object.refresh_label_options();
        object.check()?;
        Ok(object)
    }

    fn refresh_label_options(&mut self) {
        let extend = |options: &[&str], label: &str| {
            let mut options: Vec<String> = options.iter().map(|s| s.to_string()).collect();
            if !options.iter().any(|o| o == label) {
                options.push(label.to_string());
            }
            options
        };
        let x_options = extend(self.kind.x_label_options(), self.base.x_label());
        let y_options = extend(&MOBILOGRAM_LABELS, self.base.y_label());
        self.base.set_x_label_options(&x_options);
        self.base.set_y_label_options(&y_options);
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

    /// Use precomputed column (`xy`) and row (`yy`) sums
    pub fn with_marginals(
        mut self,
        xy: impl Into<ArrayData>,
        yy: impl Into<ArrayData>,
    ) -> Result<Self, ObjectError> {
        self.xy = LazyArray::loaded(xy.into());
        self.yy = LazyArray::loaded(yy.into());
        self.check()?;
        Ok(self)
    }

    /// Kind of heatmap
    pub fn kind(&self) -> HeatmapKind {
        self.kind
    }

    /// Validate the array and axes without loading them
    pub fn check(&self) -> Result<(), ObjectError> {
        let shape = self.array.shape()?;
        let [rows, cols] = shape[..] else {
            return Err(ObjectError::WrongDimensions {
                expected: 2,
                actual: shape.len(),
            });
        };
        let axes = [
            ("x", &self.x, cols),
            ("y", &self.y, rows),
            ("xy", &self.xy, cols),
            ("yy", &self.yy, rows),
        ];
        for (axis, values, expected) in axes {
            if let Some(actual) = axis_len(&values.shape()?) {
                if actual != expected {
                    return Err(ObjectError::AxisShapeMismatch {
                        axis,
                        expected,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }

    /// Intensity array, loaded on first access
    pub fn array(&self) -> Result<&ArrayData, ObjectError> {
        Ok(self.array.materialize()?)
    }

    /// x values, loaded on first access
    pub fn x(&self) -> Result<&ArrayData, ObjectError> {
        Ok(self.x.materialize()?)
    }

    /// y values, loaded on first access
    pub fn y(&self) -> Result<&ArrayData, ObjectError> {
        Ok(self.y.materialize()?)
    }

    /// Column sums, one per x value
    pub fn xy(&self) -> Result<&ArrayData, ObjectError> {
        self.xy.materialize_with(|| {
            let array = self.array()?.view2()?;
            Ok(ArrayData::from(array.sum_axis(Axis(0))))
        })
    }

    /// Row sums, one per y value
    pub fn yy(&self) -> Result<&ArrayData, ObjectError> {
        self.yy.materialize_with(|| {
            let array = self.array()?.view2()?;
            Ok(ArrayData::from(array.sum_axis(Axis(1))))
        })
    }

    /// Forget the cached row and column sums
    pub fn reset_xy_cache(&mut self) {
        self.xy.reset();
        self.yy.reset();
    }

    /// `(rows, columns)` of the array
    pub fn shape(&self) -> Result<(usize, usize), ObjectError> {
        match self.array.shape()?[..] {
            [rows, cols] => Ok((rows, cols)),
            ref other => Err(ObjectError::WrongDimensions {
                expected: 2,
                actual: other.len(),
            }),
        }
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

    fn array2(&self) -> Result<Array2<f64>, ObjectError> {
        Ok(self.array()?.to_array2()?)
    }

    /// Flat mapping of arrays, labels, metadata and auxiliary arrays
    pub fn to_dict(&self) -> Result<Metadata, ObjectError> {
        let mut dict = Metadata::new();
        dict.insert("x".into(), array_to_json(self.x()?));
        dict.insert("y".into(), array_to_json(self.y()?));
        dict.insert("array".into(), array_to_json(self.array()?));
        dict.insert("xy".into(), array_to_json(self.xy()?));
        dict.insert("yy".into(), array_to_json(self.yy()?));
        dict.insert("x_label".into(), Value::from(self.base.x_label()));
        dict.insert("y_label".into(), Value::from(self.base.y_label()));
        dict.extend(self.base.metadata().clone());
        for (key, data) in self.base.extra_data() {
            dict.insert(key.clone(), array_to_json(data));
        }
        Ok(dict)
    }

    /// Write the heatmap or one of its projections as delimited text
    pub fn to_csv(
        &self,
        path: impl AsRef<Path>,
        export: HeatmapExport,
        options: &CsvOptions,
    ) -> Result<PathBuf, ObjectError> {
        let (path, delimiter) = resolve_output(path.as_ref(), options.delimiter);
        match export {
            HeatmapExport::DriftTime => {
                let (y, yy) = (self.y()?, self.yy()?);
                let header = [self.base.y_label().to_string(), INTENSITY.to_string()];
                write_columns(&path, delimiter, &header, &[(y.dtype(), y.values()), (yy.dtype(), yy.values())])?;
            }
            HeatmapExport::Retention => {
                let (x, xy) = (self.x()?, self.xy()?);
                let header = [self.base.x_label().to_string(), INTENSITY.to_string()];
                write_columns(&path, delimiter, &header, &[(x.dtype(), x.values()), (xy.dtype(), xy.values())])?;
            }
            HeatmapExport::Array => {
                let (x, y, array) = (self.x()?, self.y()?, self.array()?);
                let dtype = array.dtype().widest(x.dtype()).widest(y.dtype());
                let header: Vec<String> = std::iter::once(String::new())
                    .chain(x.values().iter().map(|v| x.dtype().format_value(*v)))
                    .collect();
                let view = array.view2()?;
                let rows = y.values().iter().zip(view.rows()).map(|(yv, row)| {
                    std::iter::once(*yv)
                        .chain(row.iter().copied())
                        .map(|v| dtype.format_value(v))
                        .collect()
                });
                write_rows(&path, delimiter, &header, rows)?;
            }
        }
        Ok(path)
    }

    fn roi(
        &self,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
    ) -> Result<(std::ops::RangeInclusive<usize>, std::ops::RangeInclusive<usize>), ObjectError> {
        let (x, y) = (self.x()?.values(), self.y()?.values());
        if x.is_empty() || y.is_empty() {
            return Err(ObjectError::Empty);
        }
        Ok((nearest_range(x, x_min, x_max), nearest_range(y, y_min, y_max)))
    }

    /// Column sums of the region of interest, zero outside it
    pub fn get_x_for_roi(&self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Vec<f64>, ObjectError> {
        let (xr, yr) = self.roi(x_min, x_max, y_min, y_max)?;
        let view = self.array()?.view2()?;
        let mut out = vec![0.0; view.ncols()];
        for c in xr {
            out[c] = yr.clone().map(|r| view[[r, c]]).sum();
        }
        Ok(out)
    }

    /// Row sums of the region of interest, zero outside it
    pub fn get_y_for_roi(&self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Vec<f64>, ObjectError> {
        let (xr, yr) = self.roi(x_min, x_max, y_min, y_max)?;
        let view = self.array()?.view2()?;
        let mut out = vec![0.0; view.nrows()];
        for r in yr {
            out[r] = xr.clone().map(|c| view[[r, c]]).sum();
        }
        Ok(out)
    }

    /// The region of interest with its axes
    pub fn get_array_for_roi(&self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Heatmap, ObjectError> {
        let (xr, yr) = self.roi(x_min, x_max, y_min, y_max)?;
        let (x, y) = (self.x()?.values(), self.y()?.values());
        let view = self.array()?.view2()?;
        let cropped = view
            .slice(ndarray::s![*yr.start()..=*yr.end(), *xr.start()..=*xr.end()])
            .to_owned();
        Ok((x[xr].to_vec(), y[yr].to_vec(), cropped))
    }

    /// Swap the axes, their labels and options, and transpose the array
    pub fn transpose(&mut self) -> Result<&mut Self, ObjectError> {
        let transposed = self.array2()?.reversed_axes();
        self.array.replace(ArrayData::from(transposed));
        std::mem::swap(&mut self.x, &mut self.y);
        std::mem::swap(&mut self.xy, &mut self.yy);
        let base = &mut self.base;
        std::mem::swap(&mut base.x_label, &mut base.y_label);
        std::mem::swap(&mut base.x_label_options, &mut base.y_label_options);
        axes::clear_axis_cache(&mut base.extra_data, "x");
        axes::clear_axis_cache(&mut base.extra_data, "y");
        let x_default = base.metadata.remove("x_label_default");
        let y_default = base.metadata.remove("y_label_default");
        if let Some(value) = y_default {
            base.metadata.insert("x_label_default".into(), value);
        }
        if let Some(value) = x_default {
            base.metadata.insert("y_label_default".into(), value);
        }
        self.unsaved = true;
        Ok(self)
    }

    /// Reduce the number of columns to at most `max_x_size` without modifying the object
    pub fn downsample(&self, max_x_size: usize, mode: DownsampleMode) -> Result<Heatmap, ObjectError> {
        if max_x_size == 0 {
            return Err(ProcessingError::invalid("max_x_size", "must be at least 1").into());
        }
        let (x, y) = (self.x()?.values(), self.y()?.values().to_vec());
        let view = self.array()?.view2()?;
        let cols = view.ncols();
        let block = cols.div_ceil(max_x_size).max(1);
        match mode {
            DownsampleMode::SubSample => {
                let keep: Vec<usize> = (0..cols).step_by(block).collect();
                let new_x = keep.iter().map(|&c| x[c]).collect();
                Ok((new_x, y, view.select(Axis(1), &keep)))
            }
            DownsampleMode::Summed => {
                let (new_x, array) = sum_column_blocks(x, &view, block)?;
                Ok((new_x, y, array))
            }
        }
    }

    fn set_heatmap(&mut self, heatmap: Heatmap) -> Result<(), ObjectError> {
        let (x, y, array) = heatmap;
        let x = with_dtype(self.x()?.dtype(), x)?;
        let y = with_dtype(self.y()?.dtype(), y)?;
        axes::clear_axis_cache(self.base.extra_data_mut(), "x");
        axes::clear_axis_cache(self.base.extra_data_mut(), "y");
        self.x.replace(x);
        self.y.replace(y);
        self.set_array(array);
        Ok(())
    }

    fn set_array(&mut self, array: Array2<f64>) {
        self.array.replace(ArrayData::from(array));
        self.reset_xy_cache();
        self.unsaved = true;
    }

    /// Cut out the region within the bounds
    pub fn crop(&mut self, params: &Crop2dParams) -> Result<&mut Self, ObjectError> {
        let heatmap = crop_2d(self.x()?.values(), self.y()?.values(), &self.array()?.view2()?, params)?;
        self.set_heatmap(heatmap)?;
        Ok(self)
    }

    /// Interpolate onto a finer grid
    pub fn interpolate(&mut self, params: &Interpolate2dParams) -> Result<&mut Self, ObjectError> {
        let (x, y, array) = interpolate_2d(self.x()?.values(), self.y()?.values(), &self.array()?.view2()?, params)?;
        axes::clear_axis_cache(self.base.extra_data_mut(), "x");
        axes::clear_axis_cache(self.base.extra_data_mut(), "y");
        self.x.replace(ArrayData::from_vec(x));
        self.y.replace(ArrayData::from_vec(y));
        self.set_array(array);
        Ok(self)
    }

    /// Smooth along both axes
    pub fn smooth(&mut self, method: &SmoothMethod) -> Result<&mut Self, ObjectError> {
        let array = smooth_2d(&self.array()?.view2()?, method)?;
        self.set_array(array);
        Ok(self)
    }

    /// Zero every value at or below `threshold`
    pub fn baseline(&mut self, threshold: f64) -> Result<&mut Self, ObjectError> {
        let array = remove_noise_2d(&self.array()?.view2()?, threshold)?;
        self.set_array(array);
        Ok(self)
    }

    /// Normalize the intensities
    pub fn normalize(&mut self, method: Normalize2dMethod) -> Result<&mut Self, ObjectError> {
        let array = normalize_2d(&self.array()?.view2()?, method);
        self.set_array(array);
        Ok(self)
    }

    /// Run the selected steps in order: crop, interpolate, smooth, baseline, normalize
    pub fn process(&mut self, steps: &HeatmapProcessing) -> Result<&mut Self, ObjectError> {
        if let Some(params) = &steps.crop {
            self.crop(params)?;
        }
        if let Some(params) = &steps.interpolate {
            self.interpolate(params)?;
        }
        if let Some(method) = &steps.smooth {
            self.smooth(method)?;
        }
        if let Some(threshold) = steps.baseline {
            self.baseline(threshold)?;
        }
        if let Some(method) = steps.normalize {
            self.normalize(method)?;
        }
        Ok(self)
    }

    fn families(&self) -> &'static [AxisFamily] {
        if self.kind.is_ion_heatmap() {
            &[
                AxisFamily::RetentionTime,
                AxisFamily::CollisionEnergy,
                AxisFamily::DriftTime,
            ]
        } else {
            &[AxisFamily::DriftTime]
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
    /// Ion heatmaps convert between scans and minutes and between volts and
    /// electronvolts; MS/DT heatmaps only accept their current label.
    pub fn change_x_label(&mut self, to_label: &str, params: &ConversionParams) -> Result<&mut Self, ObjectError> {
        let params = self.resolve_params(params);
        let families = self.families();
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

    /// Change the y (drift-time) label, converting the values, and flush
    pub fn change_y_label(&mut self, to_label: &str, params: &ConversionParams) -> Result<&mut Self, ObjectError> {
        let params = self.resolve_params(params);
        let families = self.families();
        let options = self.base.y_label_options();
        let values = self.y.materialize()?;
        let state = AxisState {
            label: &self.base.y_label,
            values,
            options: &options,
            metadata: &mut self.base.metadata,
            extra_data: &mut self.base.extra_data,
        };
        match axes::change_axis(state, to_label, families, &Y_AXIS_KEYS, &params)? {
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

    /// Collapse an ORIGAMI-MS ion heatmap onto its collision-voltage steps.
    ///
    /// Minute axes are converted back to scans first. Without an explicit method the
    /// owning document's `origami_ms` configuration is used. The object moves to
    /// `<title> [CIU]` and is flushed there.
    pub fn apply_origami_ms(&mut self, method: Option<OrigamiMsMethod>) -> Result<&mut Self, ObjectError> {
        if !self.kind.is_ion_heatmap() {
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

        let reduction = combine_heatmap(&self.array()?.view2()?, &method)?;
        let rows = steps_to_rows(&reduction.steps);
        let steps = ArrayData::new(DType::Float64, vec![reduction.steps.len(), 3], rows)?;
        axes::clear_axis_cache(self.base.extra_data_mut(), "x");
        self.base.extra_data_mut().insert("oms_ss_es_cv".into(), steps);
        self.base
            .metadata_mut()
            .insert("origami_ms".into(), serde_json::to_value(&method)?);
        self.base.set_x_label(COLLISION_VOLTAGE);
        self.x.replace(ArrayData::from_vec(reduction.voltages));
        self.set_array(reduction.data);
        let title = self.title().map(|t| format!("{t} [CIU]"));
        if let Some(title) = title {
            self.set_title(&title);
        }
        self.flush()?;
        Ok(self)
    }

    /// Drift-time projection: the y axis against the row sums
    pub fn as_mobilogram(&self) -> Result<SpectrumObject, ObjectError> {
        Ok(SpectrumObject::mobilogram(self.y()?.clone(), self.yy()?.clone())?
            .with_labels(self.base.y_label(), INTENSITY))
    }

    /// Retention projection of an ion heatmap: the x axis against the column sums
    pub fn as_chromatogram(&self) -> Result<SpectrumObject, ObjectError> {
        if !self.kind.is_ion_heatmap() {
            return Err(ObjectError::UnsupportedOperation {
                operation: "as_chromatogram",
                class: self.kind.class_name(),
            });
        }
        Ok(SpectrumObject::chromatogram(self.x()?.clone(), self.xy()?.clone())?
            .with_labels(self.base.x_label(), INTENSITY))
    }

    /// m/z projection of an MS/DT heatmap: the x axis against the column sums
    pub fn as_mass_spectrum(&self) -> Result<SpectrumObject, ObjectError> {
        if self.kind.is_ion_heatmap() {
            return Err(ObjectError::UnsupportedOperation {
                operation: "as_mass_spectrum",
                class: self.kind.class_name(),
            });
        }
        Ok(SpectrumObject::mass_spectrum(self.x()?.clone(), self.xy()?.clone())?
            .with_labels(self.base.x_label(), INTENSITY))
    }

    /// Detached deep copy with every array in memory
    pub fn duplicate(&self) -> Result<Self, ObjectError> {
        let mut copy = self.clone();
        copy.array = LazyArray::loaded(self.array()?.clone());
        copy.x = LazyArray::loaded(self.x()?.clone());
        copy.y = LazyArray::loaded(self.y()?.clone());
        copy.xy = LazyArray::loaded(self.xy()?.clone());
        copy.yy = LazyArray::loaded(self.yy()?.clone());
        copy.base.set_owner(None);
        Ok(copy)
    }
}

/// Stored or supplied marginal sums, computed from `array` when absent
fn materialize_sum(lazy: &LazyArray, array: &LazyArray, axis: Axis) -> Result<ArrayData, StoreError> {
    lazy.materialize_with(|| {
        let view = array.materialize()?.view2()?;
        Ok::<_, StoreError>(ArrayData::from(view.sum_axis(axis)))
    })
    .cloned()
}

impl ToZarr for HeatmapObject {
    fn to_zarr(&self) -> Result<(ArrayMap, Metadata), StoreError> {
        let mut data = self.base.extra_data().clone();
        data.insert("x".into(), self.x.materialize()?.clone());
        data.insert("y".into(), self.y.materialize()?.clone());
        data.insert("array".into(), self.array.materialize()?.clone());
        data.insert("xy".into(), materialize_sum(&self.xy, &self.array, Axis(0))?);
        data.insert("yy".into(), materialize_sum(&self.yy, &self.array, Axis(1))?);
        Ok((data, self.to_attrs()))
    }
}

impl DataContainer for HeatmapObject {
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
}
