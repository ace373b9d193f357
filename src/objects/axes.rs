//! Axis-unit conversion.
//!
//! Three families of mutually convertible units are supported:
//!
//! | Family | Base unit | Other units | Parameter |
//! |---|---|---|---|
//! | Retention time | `Scans` | `Time (mins)` = `Retention time (mins)` | `scan_time` (s) |
//! | Drift time | `Drift time (bins)` | `Drift time (ms)` = `Arrival time (ms)` | `pusher_freq` (µs) |
//! | Collision energy | voltage labels (V) | energy labels (eV) | `charge` |
//!
//! Every conversion records the label the axis had before it was first touched
//! (`<axis>_label_default`) so that [`RESTORE_DEFAULT`] can return to it, and keeps
//! copies of the axis values in both units in `extra_data` so converting back reuses
//! them instead of recomputing.

use log::warn;
use serde_json::Value;

use super::labels::*;
use super::ObjectError;
use crate::array::{ArrayData, ArrayMap, DType};
use crate::store::Metadata;

/// Explicit parameters for a label change; missing values are looked up in the
/// owning document (`scan_time`, `pusher_freq`) or object metadata (`charge`)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConversionParams {
    /// Seconds per scan
    pub scan_time: Option<f64>,
    /// Pusher period in microseconds
    pub pusher_freq: Option<f64>,
    /// Ion charge
    pub charge: Option<f64>,
}

impl ConversionParams {
    /// Parameters with only `scan_time` set
    pub fn scan_time(value: f64) -> Self {
        Self {
            scan_time: Some(value),
            ..Self::default()
        }
    }

    /// Parameters with only `pusher_freq` set
    pub fn pusher_freq(value: f64) -> Self {
        Self {
            pusher_freq: Some(value),
            ..Self::default()
        }
    }

    /// Parameters with only `charge` set
    pub fn charge(value: f64) -> Self {
        Self {
            charge: Some(value),
            ..Self::default()
        }
    }
}

/// Metadata and `extra_data` keys used by one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisKeys {
    /// Metadata key holding the label before the first conversion
    pub default_label: &'static str,
    /// `extra_data` key of the values in the base unit
    pub base: &'static str,
    /// `extra_data` key of the values in the derived unit
    pub converted: &'static str,
}

/// Retention-time keys of an x axis
pub const X_RETENTION_KEYS: AxisKeys = AxisKeys {
    default_label: "x_label_default",
    base: "x_bin",
    converted: "x_min",
};

/// Drift-time keys of an x axis
pub const X_DRIFT_KEYS: AxisKeys = AxisKeys {
    default_label: "x_label_default",
    base: "x_bin",
    converted: "x_ms",
};

/// Drift-time keys of a y axis
pub const Y_DRIFT_KEYS: AxisKeys = AxisKeys {
    default_label: "y_label_default",
    base: "y_bin",
    converted: "y_ms",
};

/// Collision-energy keys of an x axis
pub const X_ENERGY_KEYS: AxisKeys = AxisKeys {
    default_label: "x_label_default",
    base: "x_cv",
    converted: "x_ev",
};

/// A family of convertible units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisFamily {
    /// Scans and minutes
    RetentionTime,
    /// Drift bins and milliseconds
    DriftTime,
    /// Volts and electronvolts
    CollisionEnergy,
}

impl AxisFamily {
    /// Whether `label` belongs to this family
    pub fn contains(&self, label: &str) -> bool {
        match self {
            AxisFamily::RetentionTime => RETENTION_LABELS.contains(&label),
            AxisFamily::DriftTime => MOBILOGRAM_LABELS.contains(&label),
            AxisFamily::CollisionEnergy => {
                VOLTAGE_LABELS.contains(&label) || ENERGY_LABELS.contains(&label)
            }
        }
    }

    /// Family able to convert `from` into `to`, chosen from `families`
    pub fn select(families: &[AxisFamily], from: &str, to: &str) -> Option<AxisFamily> {
        families
            .iter()
            .copied()
            .find(|f| f.contains(from) && f.contains(to))
    }
}

/// Current state of the axis being converted
pub struct AxisState<'a> {
    /// Current label
    pub label: &'a str,
    /// Current values
    pub values: &'a ArrayData,
    /// Allowed labels
    pub options: &'a [String],
    /// Object metadata
    pub metadata: &'a mut Metadata,
    /// Object auxiliary arrays
    pub extra_data: &'a mut ArrayMap,
}

/// Outcome of a conversion
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// Requested label equals the current one
    Unchanged,
    /// Axis should take the new label and values
    Converted {
        /// New label
        label: String,
        /// New values
        values: ArrayData,
    },
}

/// Record the default label, resolve [`RESTORE_DEFAULT`] and check the options.
///
/// Returns `None` when the target equals the current label.
pub fn resolve_target(
    state: &mut AxisState<'_>,
    to_label: &str,
    keys: &AxisKeys,
) -> Result<Option<String>, ObjectError> {
    if !state.metadata.contains_key(keys.default_label) {
        state.metadata.insert(
            keys.default_label.to_string(),
            Value::String(state.label.to_string()),
        );
    }

    let target = if to_label == RESTORE_DEFAULT {
        state
            .metadata
            .get(keys.default_label)
            .and_then(Value::as_str)
            .unwrap_or(state.label)
            .to_string()
    } else {
        to_label.to_string()
    };

    if !state.options.iter().any(|o| *o == target) {
        return Err(ObjectError::LabelNotAllowed {
            label: target,
            options: state.options.to_vec(),
        });
    }

    if target == state.label {
        warn!("The before and after labels are the same ({target})");
        return Ok(None);
    }
    Ok(Some(target))
}

/// Cached axis values under `key`, if they still match the axis length
fn cached(extra: &ArrayMap, key: &str, len: usize) -> Option<ArrayData> {
    extra.get(key).filter(|values| values.len() == len).cloned()
}

/// Drop every cached unit copy of `axis` (`"x"` or `"y"`), e.g. after cropping
pub fn clear_axis_cache(extra_data: &mut ArrayMap, axis: &str) {
    for suffix in ["bin", "min", "ms", "cv", "ev"] {
        extra_data.remove(&format!("{axis}_{suffix}"));
    }
}

fn require_positive(value: Option<f64>, name: &'static str) -> Result<f64, ObjectError> {
    match value {
        Some(v) if v > 0.0 => Ok(v),
        _ => Err(ObjectError::MissingParameter(name)),
    }
}

fn scaled(values: &ArrayData, factor: f64) -> ArrayData {
    ArrayData::from_vec(values.values().iter().map(|v| v * factor).collect())
}

fn rounded(values: &ArrayData, factor: f64) -> ArrayData {
    ArrayData::from_vec(values.values().iter().map(|v| v * factor).collect()).cast(DType::Int32)
}

fn unsupported(from: &str, to: &str) -> ObjectError {
    ObjectError::UnsupportedConversion {
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Convert between `Scans` and minutes: `minutes = scans * scan_time / 60`
pub fn change_rt_axis(
    mut state: AxisState<'_>,
    to_label: &str,
    scan_time: Option<f64>,
    keys: &AxisKeys,
) -> Result<Conversion, ObjectError> {
    let Some(target) = resolve_target(&mut state, to_label, keys)? else {
        return Ok(Conversion::Unchanged);
    };
    let current = state.label;
    let extra = state.extra_data;

    if current == SCANS {
        extra.insert(keys.base.to_string(), state.values.clone());
    }

    let values = if MINUTE_LABELS.contains(&target.as_str()) && current == SCANS {
        match cached(extra, keys.converted, state.values.len()) {
            Some(cached) => cached,
            None => {
                let scan_time = require_positive(scan_time, "scan_time")?;
                let minutes = scaled(state.values, scan_time / 60.0);
                extra.insert(keys.converted.to_string(), minutes.clone());
                minutes
            }
        }
    } else if target == SCANS && MINUTE_LABELS.contains(&current) {
        match cached(extra, keys.base, state.values.len()) {
            Some(cached) => cached,
            None => {
                let scan_time = require_positive(scan_time, "scan_time")?;
                let bins = rounded(state.values, 60.0 / scan_time);
                extra.insert(keys.base.to_string(), bins.clone());
                bins
            }
        }
    } else if MINUTE_LABELS.contains(&current) && MINUTE_LABELS.contains(&target.as_str()) {
        state.values.clone()
    } else {
        return Err(unsupported(current, &target));
    };
    Ok(Conversion::Converted {
        label: target,
        values,
    })
}

/// Convert between drift bins and milliseconds: `ms = bins * pusher_freq / 1000`
pub fn change_dt_axis(
    mut state: AxisState<'_>,
    to_label: &str,
    pusher_freq: Option<f64>,
    keys: &AxisKeys,
) -> Result<Conversion, ObjectError> {
    let Some(target) = resolve_target(&mut state, to_label, keys)? else {
        return Ok(Conversion::Unchanged);
    };
    let current = state.label;
    let extra = state.extra_data;

    if current == DRIFT_TIME_BINS {
        extra.insert(keys.base.to_string(), state.values.clone());
    }

    let values = if MILLISECOND_LABELS.contains(&target.as_str()) && current == DRIFT_TIME_BINS {
        match cached(extra, keys.converted, state.values.len()) {
            Some(cached) => cached,
            None => {
                let pusher_freq = require_positive(pusher_freq, "pusher_freq")?;
                let ms = scaled(state.values, pusher_freq / 1000.0);
                extra.insert(keys.converted.to_string(), ms.clone());
                ms
            }
        }
    } else if target == DRIFT_TIME_BINS && MILLISECOND_LABELS.contains(&current) {
        match cached(extra, keys.base, state.values.len()) {
            Some(cached) => cached,
            None => {
                let pusher_freq = require_positive(pusher_freq, "pusher_freq")?;
                let bins = rounded(state.values, 1000.0 / pusher_freq);
                extra.insert(keys.base.to_string(), bins.clone());
                bins
            }
        }
    } else if MILLISECOND_LABELS.contains(&current)
        && MILLISECOND_LABELS.contains(&target.as_str())
    {
        state.values.clone()
    } else {
        return Err(unsupported(current, &target));
    };
    Ok(Conversion::Converted {
        label: target,
        values,
    })
}

/// Convert between volts and electronvolts: `eV = V * charge`.
///
/// `charge` falls back to the `charge` metadata entry and then to 1.
pub fn change_cv_axis(
    mut state: AxisState<'_>,
    to_label: &str,
    charge: Option<f64>,
    keys: &AxisKeys,
) -> Result<Conversion, ObjectError> {
    let Some(target) = resolve_target(&mut state, to_label, keys)? else {
        return Ok(Conversion::Unchanged);
    };
    let charge = charge
        .or_else(|| state.metadata.get("charge").and_then(Value::as_f64))
        .or(Some(1.0));
    let current = state.label;
    let extra = state.extra_data;

    if VOLTAGE_LABELS.contains(&current) {
        extra.insert(keys.base.to_string(), state.values.clone());
    } else if ENERGY_LABELS.contains(&current) {
        extra.insert(keys.converted.to_string(), state.values.clone());
    }

    let to_energy = ENERGY_LABELS.contains(&target.as_str());
    let to_voltage = VOLTAGE_LABELS.contains(&target.as_str());
    let values = if to_energy && VOLTAGE_LABELS.contains(&current) {
        match cached(extra, keys.converted, state.values.len()) {
            Some(cached) => cached,
            None => {
                let charge = require_positive(charge, "charge")?;
                let ev = scaled(state.values, charge);
                extra.insert(keys.converted.to_string(), ev.clone());
                ev
            }
        }
    } else if to_voltage && ENERGY_LABELS.contains(&current) {
        match cached(extra, keys.base, state.values.len()) {
            Some(cached) => cached,
            None => {
                let charge = require_positive(charge, "charge")?;
                let volts = scaled(state.values, 1.0 / charge);
                extra.insert(keys.base.to_string(), volts.clone());
                volts
            }
        }
    } else if (to_energy && ENERGY_LABELS.contains(&current))
        || (to_voltage && VOLTAGE_LABELS.contains(&current))
    {
        state.values.clone()
    } else {
        return Err(unsupported(current, &target));
    };
    Ok(Conversion::Converted {
        label: target,
        values,
    })
}

/// Convert using the first of `families` that covers both labels.
///
/// With no matching family, only a no-op change (same label or
/// [`RESTORE_DEFAULT`] back to the current label) succeeds.
pub fn change_axis(
    mut state: AxisState<'_>,
    to_label: &str,
    families: &[AxisFamily],
    keys: &AxisKeysSet,
    params: &ConversionParams,
) -> Result<Conversion, ObjectError> {
    let target = if to_label == RESTORE_DEFAULT {
        state
            .metadata
            .get(keys.retention.default_label)
            .and_then(Value::as_str)
            .unwrap_or(state.label)
    } else {
        to_label
    };
    match AxisFamily::select(families, state.label, target) {
        Some(AxisFamily::RetentionTime) => {
            change_rt_axis(state, to_label, params.scan_time, &keys.retention)
        }
        Some(AxisFamily::DriftTime) => {
            change_dt_axis(state, to_label, params.pusher_freq, &keys.drift)
        }
        Some(AxisFamily::CollisionEnergy) => {
            change_cv_axis(state, to_label, params.charge, &keys.energy)
        }
        None => match resolve_target(&mut state, to_label, &keys.retention)? {
            None => Ok(Conversion::Unchanged),
            Some(target) => Err(unsupported(state.label, &target)),
        },
    }
}

/// Keys of one axis for every family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisKeysSet {
    /// Retention-time keys
    pub retention: AxisKeys,
    /// Drift-time keys
    pub drift: AxisKeys,
    /// Collision-energy keys
    pub energy: AxisKeys,
}

/// Keys used on x axes
pub const X_AXIS_KEYS: AxisKeysSet = AxisKeysSet {
    retention: X_RETENTION_KEYS,
    drift: X_DRIFT_KEYS,
    energy: X_ENERGY_KEYS,
};

/// Keys used on y axes
pub const Y_AXIS_KEYS: AxisKeysSet = AxisKeysSet {
    retention: AxisKeys {
        default_label: "y_label_default",
        base: "y_bin",
        converted: "y_min",
    },
    drift: Y_DRIFT_KEYS,
    energy: AxisKeys {
        default_label: "y_label_default",
        base: "y_cv",
        converted: "y_ev",
    },
};
