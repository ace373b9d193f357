use super::{DocumentRegistry, GroupError};
use crate::objects::{DataContainer, DataObject, HeatmapObject, SpectrumObject};

/// Pointer to an object stored in an open document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Title of the document
    pub document: String,
    /// Dataset path inside the document, e.g. `MassSpectra/Scan 1`
    pub path: String,
}

impl ObjectRef {
    /// Reference to `path` in `document`
    pub fn new(document: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            path: path.into(),
        }
    }

    fn resolve(&self, registry: Option<&dyn DocumentRegistry>) -> Result<DataObject, GroupError> {
        let store = registry
            .and_then(|registry| registry.get_document(&self.document))
            .ok_or_else(|| GroupError::DocumentNotFound(self.document.clone()))?;
        Ok(store.get_object(&self.path)?)
    }
}

/// A group member: either an object in memory or a reference that is loaded on
/// first access
#[derive(Debug, Clone)]
pub enum Member {
    /// Object in memory
    Loaded(DataObject),
    /// Object still in its document
    Reference(ObjectRef),
}

impl From<DataObject> for Member {
    fn from(object: DataObject) -> Self {
        Member::Loaded(object)
    }
}

impl From<SpectrumObject> for Member {
    fn from(object: SpectrumObject) -> Self {
        Member::Loaded(object.into())
    }
}

impl From<HeatmapObject> for Member {
    fn from(object: HeatmapObject) -> Self {
        Member::Loaded(object.into())
    }
}

impl From<ObjectRef> for Member {
    fn from(reference: ObjectRef) -> Self {
        Member::Reference(reference)
    }
}

impl<D: Into<String>, P: Into<String>> From<(D, P)> for Member {
    fn from((document, path): (D, P)) -> Self {
        Member::Reference(ObjectRef::new(document, path))
    }
}

/// Ordered members of a data group, addressed by position and, when the group
/// was built from named members, by name
#[derive(Debug, Clone, Default)]
pub struct DataObjectsContainer {
    names: Option<Vec<String>>,
    members: Vec<Member>,
}

impl DataObjectsContainer {
    /// Unnamed members, addressed by position only
    pub fn from_list<I, M>(members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Member>,
    {
        Self {
            names: None,
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Named members, addressed by position (in insertion order) or name
    pub fn from_named<I, K, M>(members: I) -> Result<Self, GroupError>
    where
        I: IntoIterator<Item = (K, M)>,
        K: Into<String>,
        M: Into<Member>,
    {
        let mut names: Vec<String> = Vec::new();
        let mut items = Vec::new();
        for (name, member) in members {
            let name = name.into();
            if names.contains(&name) {
                return Err(GroupError::DuplicateName(name));
            }
            names.push(name);
            items.push(member.into());
        }
        Ok(Self {
            names: Some(names),
            members: items,
        })
    }

    /// Whether members can be looked up by name
    pub fn is_keyed(&self) -> bool {
        self.names.is_some()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the container is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member names; positions for unnamed members
    pub fn names(&self) -> Vec<String> {
        match &self.names {
            Some(names) => names.clone(),
            None => (0..self.members.len()).map(|i| i.to_string()).collect(),
        }
    }

    /// Whether every member is in memory
    pub fn is_loaded(&self) -> bool {
        self.members.iter().all(|m| matches!(m, Member::Loaded(_)))
    }

    /// Position of the member called `name`
    pub fn index_of(&self, name: &str) -> Result<usize, GroupError> {
        let names = self
            .names
            .as_ref()
            .ok_or_else(|| GroupError::NotKeyed(name.to_string()))?;
        names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| GroupError::NotFound(name.to_string()))
    }

    /// Member at `index`, loaded or not
    pub fn member(&self, index: usize) -> Option<&Member> {
        self.members.get(index)
    }

    /// Object at `index`, loading it from its document first if needed
    pub fn resolve(
        &mut self,
        index: usize,
        registry: Option<&dyn DocumentRegistry>,
    ) -> Result<&mut DataObject, GroupError> {
        let len = self.members.len();
        let member = self
            .members
            .get_mut(index)
            .ok_or(GroupError::IndexOutOfRange { index, len })?;
        if let Member::Reference(reference) = member {
            *member = Member::Loaded(reference.resolve(registry)?);
        }
        match member {
            Member::Loaded(object) => Ok(object),
            Member::Reference(reference) => Err(GroupError::DocumentNotFound(reference.document.clone())),
        }
    }

    /// Load every member that is still a reference
    pub fn resolve_all(&mut self, registry: Option<&dyn DocumentRegistry>) -> Result<(), GroupError> {
        for index in 0..self.members.len() {
            self.resolve(index, registry)?;
        }
        Ok(())
    }

    /// Members that are in memory, in order
    pub fn loaded(&self) -> impl Iterator<Item = &DataObject> {
        self.members.iter().filter_map(|m| match m {
            Member::Loaded(object) => Some(object),
            Member::Reference(_) => None,
        })
    }

    /// Mutable access to the members that are in memory
    pub fn loaded_mut(&mut self) -> impl Iterator<Item = &mut DataObject> {
        self.members.iter_mut().filter_map(|m| match m {
            Member::Loaded(object) => Some(object),
            Member::Reference(_) => None,
        })
    }

    /// One `document | dataset` line per member
    pub fn describe(&self) -> String {
        self.members
            .iter()
            .map(|member| match member {
                Member::Reference(r) => format!("    {} | {}", r.document, r.path),
                Member::Loaded(object) => {
                    let object = object.as_container();
                    let document = object
                        .get_parent()
                        .map(|store| store.title().to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let dataset = object.title().unwrap_or(object.class_name());
                    format!("    {document} | {dataset}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
