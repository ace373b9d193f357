//! Reconstruction of typed objects from stored groups.

use serde_json::Value;

use super::{DocumentStore, Group, StoreError};
use crate::array::{ArrayMap, LazyArray};
use crate::objects::labels::{DRIFT_TIME_BINS, INTENSITY};
use crate::objects::{
    user_metadata, ContainerBase, DataObject, HeatmapKind, HeatmapObject, ObjectError, ObjectKind,
    Owner, SpectrumKind, SpectrumObject,
};

const SPECTRUM_ARRAYS: [&str; 2] = ["x", "y"];
const HEATMAP_ARRAYS: [&str; 5] = ["array", "x", "y", "xy", "yy"];

/// Build the object stored in `group`, dispatching on its `class` attribute
pub(crate) fn reconstruct(store: &DocumentStore, group: &Group) -> Result<DataObject, StoreError> {
    let attrs = group.attrs()?;
    let class = attrs
        .get("class")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::MissingClass(group.path().to_string()))?;
    let kind = ObjectKind::from_class_name(class).ok_or_else(|| StoreError::UnknownClass {
        class: class.to_string(),
        path: group.path().to_string(),
    })?;

    let label = |key: &str, default: &str| {
        attrs
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    let mut base = match kind {
        ObjectKind::Spectrum(kind) => {
            ContainerBase::new(label("x_label", kind.default_x_label()), label("y_label", INTENSITY))
        }
        ObjectKind::Heatmap(kind) => ContainerBase::new(
            label("x_label", kind.default_x_label()),
            label("y_label", DRIFT_TIME_BINS),
        ),
    };
    base.metadata_mut().extend(user_metadata(&attrs));
    base.set_owner(Some(Owner::new(store, group.path())));
    base.set_output_path(Some(store.output_path()));

    let object = match kind {
        ObjectKind::Spectrum(kind) => {
            *base.extra_data_mut() = extra_arrays(group, &SPECTRUM_ARRAYS)?;
            spectrum(group, kind, base).map(DataObject::Spectrum)
        }
        ObjectKind::Heatmap(kind) => {
            *base.extra_data_mut() = extra_arrays(group, &HEATMAP_ARRAYS)?;
            heatmap(group, kind, base).map(DataObject::Heatmap)
        }
    };
    object.map_err(|source| match source {
        ObjectError::StoreError(err) => err,
        other => StoreError::Reconstruct {
            path: group.path().to_string(),
            source: Box::new(other),
        },
    })
}

/// Every stored array that is not one of the object's own axes
fn extra_arrays(group: &Group, primary: &[&str]) -> Result<ArrayMap, StoreError> {
    let mut extra = ArrayMap::new();
    for name in group.array_keys()? {
        if !primary.contains(&name.as_str()) {
            extra.insert(name.clone(), group.read_array(&name)?);
        }
    }
    Ok(extra)
}

fn spectrum(
    group: &Group,
    kind: SpectrumKind,
    base: ContainerBase,
) -> Result<SpectrumObject, ObjectError> {
    let x = LazyArray::unloaded(group.array_handle("x")?);
    let y = LazyArray::unloaded(group.array_handle("y")?);
    SpectrumObject::from_parts(kind, group.name().to_string(), base, x, y)
}

fn heatmap(
    group: &Group,
    kind: HeatmapKind,
    base: ContainerBase,
) -> Result<HeatmapObject, ObjectError> {
    let array = LazyArray::unloaded(group.array_handle("array")?);
    let x = LazyArray::unloaded(group.array_handle("x")?);
    let y = LazyArray::unloaded(group.array_handle("y")?);
    // marginals are recomputed from the array when they were never written
    let marginal = |name: &str| -> Result<LazyArray, StoreError> {
        if group.contains_array(name) {
            Ok(LazyArray::unloaded(group.array_handle(name)?))
        } else {
            Ok(LazyArray::pending())
        }
    };
    HeatmapObject::from_parts(
        kind,
        group.name().to_string(),
        base,
        array,
        x,
        y,
        marginal("xy")?,
        marginal("yy")?,
    )
}
