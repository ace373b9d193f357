//! ORIGAMI-MS reduction.
//!
//! ORIGAMI-MS acquisitions ramp the collision voltage in steps while recording scans.
//! The reduction sums the scans acquired at each voltage step, turning a scan axis into
//! a collision-voltage axis.

use ndarray::{s, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::ProcessingError;

/// Voltage ramp of an ORIGAMI-MS acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum OrigamiMsMethod {
    /// Constant number of scans per voltage
    Linear {
        /// First scan of the ramp
        start_scan: usize,
        /// First voltage
        start_voltage: f64,
        /// Last voltage
        end_voltage: f64,
        /// Voltage increment
        step_voltage: f64,
        /// Scans acquired at each voltage
        scans_per_voltage: usize,
    },
    /// Scans per voltage grow exponentially above a fraction of the end voltage
    Exponential {
        /// First scan of the ramp
        start_scan: usize,
        /// First voltage
        start_voltage: f64,
        /// Last voltage
        end_voltage: f64,
        /// Voltage increment
        step_voltage: f64,
        /// Scans acquired at each voltage before the exponential part
        scans_per_voltage: usize,
        /// Exponent increment per step
        exponential_increment: f64,
        /// Percentage of the end voltage where the exponential part starts
        exponential_percentage: f64,
    },
    /// Scans per voltage follow a Boltzmann curve
    Boltzmann {
        /// First scan of the ramp
        start_scan: usize,
        /// First voltage
        start_voltage: f64,
        /// Last voltage
        end_voltage: f64,
        /// Voltage increment
        step_voltage: f64,
        /// Base number of scans per voltage
        scans_per_voltage: usize,
        /// Width of the Boltzmann curve
        boltzmann_offset: f64,
    },
    /// Explicit `(scans, voltage)` pairs
    #[serde(rename = "User-defined")]
    UserDefined {
        /// First scan of the ramp
        start_scan: usize,
        /// Number of scans and voltage of every step
        steps: Vec<(usize, f64)>,
    },
}

/// One voltage step: scans `start..end` were acquired at `voltage`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageStep {
    /// First scan (inclusive)
    pub start: usize,
    /// Last scan (exclusive)
    pub end: usize,
    /// Collision voltage
    pub voltage: f64,
}

const BOLTZMANN_A1: f64 = 2.0;
const BOLTZMANN_A2: f64 = 0.07;
const BOLTZMANN_X0: f64 = 47.0;

fn voltages(start: f64, end: f64, step: f64) -> Result<Vec<f64>, ProcessingError> {
    if !(step > 0.0) {
        return Err(ProcessingError::invalid("step_voltage", "must be positive"));
    }
    if end < start {
        return Err(ProcessingError::invalid(
            "end_voltage",
            "must not be below the start voltage",
        ));
    }
    let n = ((end - start) / step) as usize + 1;
    Ok(super::utils::linspace(start, end, n))
}

fn steps_from_counts(start_scan: usize, counts: &[usize], cvs: &[f64]) -> Vec<VoltageStep> {
    let mut first = start_scan;
    counts
        .iter()
        .zip(cvs)
        .map(|(&count, &voltage)| {
            let step = VoltageStep {
                start: first,
                end: first + count,
                voltage,
            };
            first += count;
            step
        })
        .collect()
}

impl OrigamiMsMethod {
    /// Compute the scan window of every voltage step
    pub fn scan_list(&self) -> Result<Vec<VoltageStep>, ProcessingError> {
        match self {
            OrigamiMsMethod::Linear {
                start_scan,
                start_voltage,
                end_voltage,
                step_voltage,
                scans_per_voltage,
            } => {
                let cvs = voltages(*start_voltage, *end_voltage, *step_voltage)?;
                let counts = vec![*scans_per_voltage; cvs.len()];
                Ok(steps_from_counts(*start_scan, &counts, &cvs))
            }
            OrigamiMsMethod::Exponential {
                start_scan,
                start_voltage,
                end_voltage,
                step_voltage,
                scans_per_voltage,
                exponential_increment,
                exponential_percentage,
            } => {
                let cvs = voltages(*start_voltage, *end_voltage, *step_voltage)?;
                let threshold = end_voltage * exponential_percentage / 100.0;
                let mut accumulator = 0.0;
                let counts: Vec<usize> = cvs
                    .iter()
                    .map(|&cv| {
                        if cv >= threshold {
                            accumulator += exponential_increment;
                            (*scans_per_voltage as f64 * f64::exp(accumulator)).round() as usize
                        } else {
                            *scans_per_voltage
                        }
                    })
                    .collect();
                Ok(steps_from_counts(*start_scan, &counts, &cvs))
            }
            OrigamiMsMethod::Boltzmann {
                start_scan,
                start_voltage,
                end_voltage,
                step_voltage,
                scans_per_voltage,
                boltzmann_offset,
            } => {
                if *boltzmann_offset == 0.0 {
                    return Err(ProcessingError::invalid(
                        "boltzmann_offset",
                        "must not be zero",
                    ));
                }
                let cvs = voltages(*start_voltage, *end_voltage, *step_voltage)?;
                let counts: Vec<usize> = cvs
                    .iter()
                    .map(|&cv| {
                        let fit = (1.0
                            / (BOLTZMANN_A2
                                + (BOLTZMANN_A1 - BOLTZMANN_A2)
                                    / (1.0 + f64::exp((cv - BOLTZMANN_X0) / boltzmann_offset))))
                        .round()
                        .max(1.0);
                        fit as usize * scans_per_voltage
                    })
                    .collect();
                Ok(steps_from_counts(*start_scan, &counts, &cvs))
            }
            OrigamiMsMethod::UserDefined { start_scan, steps } => {
                if steps.is_empty() {
                    return Err(ProcessingError::invalid("steps", "must not be empty"));
                }
                let counts: Vec<usize> = steps.iter().map(|(n, _)| *n).collect();
                let cvs: Vec<f64> = steps.iter().map(|(_, cv)| *cv).collect();
                Ok(steps_from_counts(*start_scan, &counts, &cvs))
            }
        }
    }
}

/// Result of an ORIGAMI-MS reduction
#[derive(Debug, Clone, PartialEq)]
pub struct OrigamiMsReduction<T> {
    /// Reduced intensities, one column (or value) per voltage step
    pub data: T,
    /// Collision voltage of each step
    pub voltages: Vec<f64>,
    /// Scan window of each step
    pub steps: Vec<VoltageStep>,
}

fn clip(step: &VoltageStep, len: usize) -> (usize, usize) {
    (step.start.min(len), step.end.min(len))
}

/// Sum the columns of a `(drift, scans)` heatmap within each voltage step
pub fn combine_heatmap(
    array: &ArrayView2<f64>,
    method: &OrigamiMsMethod,
) -> Result<OrigamiMsReduction<Array2<f64>>, ProcessingError> {
    let steps = method.scan_list()?;
    let mut out = Array2::zeros((array.nrows(), steps.len()));
    for (i, step) in steps.iter().enumerate() {
        let (start, end) = clip(step, array.ncols());
        if start < end {
            out.column_mut(i)
                .assign(&array.slice(s![.., start..end]).sum_axis(Axis(1)));
        }
    }
    Ok(OrigamiMsReduction {
        data: out,
        voltages: steps.iter().map(|s| s.voltage).collect(),
        steps,
    })
}

/// Sum a chromatogram within each voltage step
pub fn combine_chromatogram(
    y: &[f64],
    method: &OrigamiMsMethod,
) -> Result<OrigamiMsReduction<Vec<f64>>, ProcessingError> {
    let steps = method.scan_list()?;
    let data = steps
        .iter()
        .map(|step| {
            let (start, end) = clip(step, y.len());
            y[start..end].iter().sum()
        })
        .collect();
    Ok(OrigamiMsReduction {
        data,
        voltages: steps.iter().map(|s| s.voltage).collect(),
        steps,
    })
}

/// Flatten steps into a `(n_steps, 3)` row-major buffer of `start, end, voltage`
pub fn steps_to_rows(steps: &[VoltageStep]) -> Vec<f64> {
    steps
        .iter()
        .flat_map(|s| [s.start as f64, s.end as f64, s.voltage])
        .collect()
}
