use ndarray::Array2;

use super::{DataGroup, DataObjectsContainer, GroupCore, GroupError};
use crate::array::ArrayData;
use crate::objects::labels::{DRIFT_TIME_BINS, MOBILOGRAM_LABELS};
use crate::objects::{ContainerBase, DataContainer, DataObject, HeatmapKind, HeatmapObject};

/// Group of heatmaps sharing their axes
#[derive(Debug, Clone)]
pub struct HeatmapGroup {
    kind: HeatmapKind,
    core: GroupCore,
}

impl HeatmapGroup {
    /// Group of `kind` with the kind's default labels and options
    pub fn new(kind: HeatmapKind, members: DataObjectsContainer) -> Self {
        let mut base = ContainerBase::new(kind.default_x_label(), DRIFT_TIME_BINS);
        base.set_x_label_options(kind.x_label_options());
        base.set_y_label_options(&MOBILOGRAM_LABELS);
        Self {
            kind,
            core: GroupCore::new(members, base),
        }
    }

    /// Group of ion heatmaps
    pub fn ion_heatmaps(members: DataObjectsContainer) -> Self {
        Self::new(HeatmapKind::IonHeatmap, members)
    }

    /// Group of MS/DT heatmaps
    pub fn msdt_heatmaps(members: DataObjectsContainer) -> Self {
        Self::new(HeatmapKind::MassSpectrumHeatmap, members)
    }

    /// Kind of the members
    pub fn kind(&self) -> HeatmapKind {
        self.kind
    }

    /// Every member as a heatmap, loading lazy members first
    pub fn heatmaps(&mut self) -> Result<Vec<&HeatmapObject>, GroupError> {
        let class = self.class_name();
        self.core
            .objects()?
            .into_iter()
            .map(|object| match object {
                DataObject::Heatmap(h) => Ok(h),
                DataObject::Spectrum(s) => Err(GroupError::WrongMember {
                    expected: class,
                    actual: s.class_name(),
                }),
            })
            .collect()
    }

    /// Every member's intensity array
    pub fn arrays(&mut self) -> Result<Vec<ArrayData>, GroupError> {
        self.heatmaps()?
            .iter()
            .map(|h| Ok(h.array()?.clone()))
            .collect()
    }

    fn first(&mut self) -> Result<&HeatmapObject, GroupError> {
        self.heatmaps()?.into_iter().next().ok_or(GroupError::Empty)
    }

    /// Shared x label; fails when members use different units
    pub fn x_label(&mut self) -> Result<String, GroupError> {
        if !self.validate_x_labels()? {
            return Err(GroupError::Incompatible("x-axis labels are not the same".into()));
        }
        Ok(self.first()?.base().x_label().to_string())
    }

    /// Shared y label; fails when members use different units
    pub fn y_label(&mut self) -> Result<String, GroupError> {
        if !self.validate_y_labels()? {
            return Err(GroupError::Incompatible("y-axis labels are not the same".into()));
        }
        Ok(self.first()?.base().y_label().to_string())
    }

    /// x values of the first member
    pub fn x(&mut self) -> Result<ArrayData, GroupError> {
        self.x_label()?;
        Ok(self.first()?.x()?.clone())
    }

    /// y values of the first member
    pub fn y(&mut self) -> Result<ArrayData, GroupError> {
        self.y_label()?;
        Ok(self.first()?.y()?.clone())
    }

    fn combine(&mut self, mean: bool) -> Result<HeatmapObject, GroupError> {
        if !self.validate_shape()? {
            return Err(GroupError::Incompatible("heatmaps have different shapes".into()));
        }
        let (x_label, y_label) = (self.x_label()?, self.y_label()?);
        let kind = self.kind;
        let heatmaps = self.heatmaps()?;
        let Some(first) = heatmaps.first() else {
            return Err(GroupError::Empty);
        };
        let mut total: Array2<f64> = first.array()?.to_array2().map_err(crate::objects::ObjectError::from)?;
        for heatmap in &heatmaps[1..] {
            total += &heatmap.array()?.view2().map_err(crate::objects::ObjectError::from)?;
        }
        if mean {
            total /= heatmaps.len() as f64;
        }
        let (x, y) = (first.x()?.clone(), first.y()?.clone());
        Ok(HeatmapObject::new(kind, total, x, y)?.with_labels(x_label, y_label))
    }

    /// Element-wise sum of the members
    pub fn sum(&mut self) -> Result<HeatmapObject, GroupError> {
        self.combine(false)
    }

    /// Element-wise mean of the members
    pub fn mean(&mut self) -> Result<HeatmapObject, GroupError> {
        self.combine(true)
    }
}

impl DataGroup for HeatmapGroup {
    fn core(&self) -> &GroupCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut GroupCore {
        &mut self.core
    }

    fn class_name(&self) -> &'static str {
        match self.kind {
            HeatmapKind::IonHeatmap | HeatmapKind::StitchIonHeatmap => "IonHeatmapGroup",
            HeatmapKind::MassSpectrumHeatmap => "MassSpectrumHeatmapGroup",
        }
    }

    /// Heatmaps are combined on their own grid
    fn need_resample(&mut self) -> Result<bool, GroupError> {
        Ok(false)
    }

    fn reset(&mut self) {}
}
