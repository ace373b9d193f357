//! Axis labels, their synonym groups and the object kinds that use them.

/// m/z axis
pub const MZ: &str = "m/z (Da)";
/// Intensity axis
pub const INTENSITY: &str = "Intensity";
/// Scan index
pub const SCANS: &str = "Scans";
/// Time in minutes
pub const TIME_MINS: &str = "Time (mins)";
/// Retention time in minutes; synonym of [`TIME_MINS`]
pub const RETENTION_TIME_MINS: &str = "Retention time (mins)";
/// Collision voltage
pub const COLLISION_VOLTAGE: &str = "Collision Voltage (V)";
/// Activation voltage in volts
pub const ACTIVATION_VOLTAGE_V: &str = "Activation Voltage (V)";
/// Activation energy in volts
pub const ACTIVATION_ENERGY_V: &str = "Activation Energy (V)";
/// Lab-frame energy
pub const LAB_FRAME_ENERGY: &str = "Lab Frame Energy (eV)";
/// Activation voltage in electronvolts
pub const ACTIVATION_VOLTAGE_EV: &str = "Activation Voltage (eV)";
/// Activation energy in electronvolts
pub const ACTIVATION_ENERGY_EV: &str = "Activation Energy (eV)";
/// Drift-time bin index
pub const DRIFT_TIME_BINS: &str = "Drift time (bins)";
/// Drift time in milliseconds
pub const DRIFT_TIME_MS: &str = "Drift time (ms)";
/// Arrival time in milliseconds; synonym of [`DRIFT_TIME_MS`]
pub const ARRIVAL_TIME_MS: &str = "Arrival time (ms)";
/// Collision cross section
pub const CCS: &str = "Collision Cross Section (Å²)";
/// Short form of [`CCS`]
pub const CCS_SHORT: &str = "CCS (Å²)";
/// Pseudo-label that reverts an axis to the label it had before the first conversion
pub const RESTORE_DEFAULT: &str = "Restore default";

/// Minute-based retention labels
pub const MINUTE_LABELS: [&str; 2] = [TIME_MINS, RETENTION_TIME_MINS];
/// Retention-time family
pub const RETENTION_LABELS: [&str; 3] = [SCANS, TIME_MINS, RETENTION_TIME_MINS];
/// Voltage-based collision labels
pub const VOLTAGE_LABELS: [&str; 3] = [COLLISION_VOLTAGE, ACTIVATION_VOLTAGE_V, ACTIVATION_ENERGY_V];
/// Energy-based collision labels
pub const ENERGY_LABELS: [&str; 3] = [LAB_FRAME_ENERGY, ACTIVATION_VOLTAGE_EV, ACTIVATION_ENERGY_EV];
/// Millisecond drift-time labels
pub const MILLISECOND_LABELS: [&str; 2] = [DRIFT_TIME_MS, ARRIVAL_TIME_MS];
/// Drift-time family
pub const DRIFT_LABELS: [&str; 3] = [DRIFT_TIME_BINS, DRIFT_TIME_MS, ARRIVAL_TIME_MS];

/// Allowed x labels of chromatograms and ion heatmaps
pub const CHROMATOGRAM_X_LABELS: [&str; 9] = [
    SCANS,
    TIME_MINS,
    RETENTION_TIME_MINS,
    COLLISION_VOLTAGE,
    ACTIVATION_VOLTAGE_V,
    ACTIVATION_ENERGY_V,
    LAB_FRAME_ENERGY,
    ACTIVATION_VOLTAGE_EV,
    ACTIVATION_ENERGY_EV,
];

/// Allowed drift-time labels of mobilograms and heatmap y axes
pub const MOBILOGRAM_LABELS: [&str; 5] = [DRIFT_TIME_BINS, DRIFT_TIME_MS, ARRIVAL_TIME_MS, CCS, CCS_SHORT];

/// Representative label of the synonym group `label` belongs to.
///
/// Labels without synonyms map to themselves.
pub fn canonical_label(label: &str) -> &str {
    match label {
        ARRIVAL_TIME_MS => DRIFT_TIME_MS,
        CCS_SHORT => CCS,
        RETENTION_TIME_MINS => TIME_MINS,
        ACTIVATION_VOLTAGE_V | ACTIVATION_ENERGY_V => COLLISION_VOLTAGE,
        ACTIVATION_VOLTAGE_EV | ACTIVATION_ENERGY_EV => LAB_FRAME_ENERGY,
        other => other,
    }
}

/// Whether two labels name the same physical unit
pub fn are_synonyms(a: &str, b: &str) -> bool {
    canonical_label(a) == canonical_label(b)
}

/// One-dimensional object kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectrumKind {
    /// Mass spectrum (m/z vs intensity)
    MassSpectrum,
    /// Chromatogram (scans/time/voltage vs intensity)
    Chromatogram,
    /// Mobilogram (drift time vs intensity)
    Mobilogram,
}

impl SpectrumKind {
    /// Value of the `class` attribute
    pub fn class_name(&self) -> &'static str {
        match self {
            SpectrumKind::MassSpectrum => "MassSpectrumObject",
            SpectrumKind::Chromatogram => "ChromatogramObject",
            SpectrumKind::Mobilogram => "MobilogramObject",
        }
    }

    /// Top-level store category
    pub fn document_key(&self) -> &'static str {
        match self {
            SpectrumKind::MassSpectrum => "MassSpectra",
            SpectrumKind::Chromatogram => "Chromatograms",
            SpectrumKind::Mobilogram => "Mobilograms",
        }
    }

    /// Default x label
    pub fn default_x_label(&self) -> &'static str {
        match self {
            SpectrumKind::MassSpectrum => MZ,
            SpectrumKind::Chromatogram => SCANS,
            SpectrumKind::Mobilogram => DRIFT_TIME_BINS,
        }
    }

    /// Allowed x labels
    pub fn x_label_options(&self) -> &'static [&'static str] {
        match self {
            SpectrumKind::MassSpectrum => &[MZ],
            SpectrumKind::Chromatogram => &CHROMATOGRAM_X_LABELS,
            SpectrumKind::Mobilogram => &MOBILOGRAM_LABELS,
        }
    }

    /// Whether zero rows are dropped on export unless overridden
    pub fn default_remove_zeros(&self) -> bool {
        matches!(self, SpectrumKind::MassSpectrum)
    }

    /// Default linearization bin size for this kind of axis
    pub fn default_bin_size(&self) -> f64 {
        match self {
            SpectrumKind::MassSpectrum => 0.01,
            SpectrumKind::Chromatogram | SpectrumKind::Mobilogram => 1.0,
        }
    }
}

/// Two-dimensional object kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeatmapKind {
    /// Drift time vs scans/time/voltage
    IonHeatmap,
    /// Ion heatmap assembled from mobilograms
    StitchIonHeatmap,
    /// Drift time vs m/z
    MassSpectrumHeatmap,
}

impl HeatmapKind {
    /// Value of the `class` attribute
    pub fn class_name(&self) -> &'static str {
        match self {
            HeatmapKind::IonHeatmap => "IonHeatmapObject",
            HeatmapKind::StitchIonHeatmap => "StitchIonHeatmapObject",
            HeatmapKind::MassSpectrumHeatmap => "MassSpectrumHeatmapObject",
        }
    }

    /// Top-level store category
    pub fn document_key(&self) -> &'static str {
        match self {
            HeatmapKind::IonHeatmap | HeatmapKind::StitchIonHeatmap => "IonHeatmaps",
            HeatmapKind::MassSpectrumHeatmap => "MSDTHeatmaps",
        }
    }

    /// Default x label
    pub fn default_x_label(&self) -> &'static str {
        match self {
            HeatmapKind::IonHeatmap | HeatmapKind::StitchIonHeatmap => SCANS,
            HeatmapKind::MassSpectrumHeatmap => MZ,
        }
    }

    /// Allowed x labels
    pub fn x_label_options(&self) -> &'static [&'static str] {
        match self {
            HeatmapKind::IonHeatmap | HeatmapKind::StitchIonHeatmap => &CHROMATOGRAM_X_LABELS,
            HeatmapKind::MassSpectrumHeatmap => &[MZ],
        }
    }

    /// Whether the x axis is a retention/voltage axis
    pub fn is_ion_heatmap(&self) -> bool {
        !matches!(self, HeatmapKind::MassSpectrumHeatmap)
    }
}

/// Kind of any data object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// One-dimensional object
    Spectrum(SpectrumKind),
    /// Two-dimensional object
    Heatmap(HeatmapKind),
}

impl ObjectKind {
    /// All kinds, in the order their classes are documented
    pub const ALL: [ObjectKind; 6] = [
        ObjectKind::Spectrum(SpectrumKind::MassSpectrum),
        ObjectKind::Spectrum(SpectrumKind::Chromatogram),
        ObjectKind::Spectrum(SpectrumKind::Mobilogram),
        ObjectKind::Heatmap(HeatmapKind::IonHeatmap),
        ObjectKind::Heatmap(HeatmapKind::StitchIonHeatmap),
        ObjectKind::Heatmap(HeatmapKind::MassSpectrumHeatmap),
    ];

    /// Kind named by a `class` attribute
    pub fn from_class_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.class_name() == name)
    }

    /// Value of the `class` attribute
    pub fn class_name(&self) -> &'static str {
        match self {
            ObjectKind::Spectrum(kind) => kind.class_name(),
            ObjectKind::Heatmap(kind) => kind.class_name(),
        }
    }

    /// Top-level store category
    pub fn document_key(&self) -> &'static str {
        match self {
            ObjectKind::Spectrum(kind) => kind.document_key(),
            ObjectKind::Heatmap(kind) => kind.document_key(),
        }
    }
}
