//! The project object table

use indexmap::IndexMap;

use crate::error::ModelError;
use crate::id::{IdAllocator, ObjectId};
use crate::object::{
    BuildConfiguration, BuildFile, BuildPhase, ConfigurationList, FileReference, Group, Object,
    Project, Target,
};

/// In-memory project graph
///
/// Objects are kept in file order; new objects are appended. Nothing is
/// ever removed: the transformation only appends objects and updates
/// fields in place.
#[derive(Debug, Clone)]
pub struct ProjectGraph {
    root: ObjectId,
    objects: IndexMap<ObjectId, Object>,
    allocator: IdAllocator,
}

/// A reference from `from` to an identifier absent from the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// Referring object
    pub from: ObjectId,
    /// Missing identifier
    pub to: ObjectId,
}

macro_rules! typed_lookup {
    ($($get:ident, $get_mut:ident => $ty:ident via $as_ref:ident, $as_mut:ident, $label:literal;)*) => {
        $(
            #[doc = concat!("Look up a [`", stringify!($ty), "`]")]
            #[must_use]
            pub fn $get(&self, id: &ObjectId) -> Option<&$ty> {
                self.objects.get(id).and_then(Object::$as_ref)
            }

            #[doc = concat!("Mutably look up a [`", stringify!($ty), "`]")]
            ///
            /// # Errors
            /// Returns error if the object is absent or of another kind.
            pub fn $get_mut(&mut self, id: &ObjectId) -> Result<&mut $ty, ModelError> {
                self.objects
                    .get_mut(id)
                    .and_then(Object::$as_mut)
                    .ok_or_else(|| ModelError::wrong_kind(id, $label))
            }
        )*
    };
}

impl ProjectGraph {
    /// Assemble a graph from decoded objects
    ///
    /// The allocator is seeded from the root identifier and the object
    /// count, so identical inputs allocate identical identifiers.
    ///
    /// # Errors
    /// Returns error if `root` is absent or is not a `PBXProject`.
    pub fn new(root: ObjectId, objects: IndexMap<ObjectId, Object>) -> Result<Self, ModelError> {
        if !matches!(objects.get(&root), Some(Object::Project(_))) {
            return Err(ModelError::InvalidRoot(root));
        }
        let mut seed = root.as_str().as_bytes().to_vec();
        seed.extend_from_slice(&(objects.len() as u64).to_le_bytes());
        Ok(Self {
            allocator: IdAllocator::seeded(&seed),
            root,
            objects,
        })
    }

    /// Root project identifier
    #[inline]
    #[must_use]
    pub fn root_id(&self) -> &ObjectId {
        &self.root
    }

    /// Root project
    #[must_use]
    pub fn project(&self) -> &Project {
        match self.objects.get(&self.root) {
            Some(Object::Project(p)) => p,
            _ => unreachable!("root checked at construction"),
        }
    }

    /// Mutable root project
    pub fn project_mut(&mut self) -> &mut Project {
        match self.objects.get_mut(&self.root) {
            Some(Object::Project(p)) => p,
            _ => unreachable!("root checked at construction"),
        }
    }

    /// Look up any object
    #[inline]
    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    /// Check identifier presence
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Number of objects
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the table is empty (never the case for a valid graph)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate objects in table order
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &Object)> {
        self.objects.iter()
    }

    /// Allocate a fresh identifier
    ///
    /// Distinct from every identifier in the table and from every identifier
    /// allocated earlier on this graph.
    pub fn next_id(&mut self) -> ObjectId {
        let objects = &self.objects;
        self.allocator.next(|candidate| objects.contains_key(candidate))
    }

    /// Insert a new object under a freshly allocated identifier
    pub fn insert(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = self.next_id();
        self.objects.insert(id.clone(), object.into());
        id
    }

    /// Insert under a caller-chosen identifier (pre-allocated via
    /// [`ProjectGraph::next_id`])
    ///
    /// # Errors
    /// Returns error if the identifier is already present.
    pub fn insert_with_id(
        &mut self,
        id: ObjectId,
        object: impl Into<Object>,
    ) -> Result<(), ModelError> {
        if self.objects.contains_key(&id) {
            return Err(ModelError::DuplicateId(id));
        }
        self.objects.insert(id, object.into());
        Ok(())
    }

    typed_lookup! {
        target, target_mut => Target via as_target, as_target_mut, "target";
        group, group_mut => Group via as_group, as_group_mut, "group";
        file_reference, file_reference_mut => FileReference via as_file_reference, as_file_reference_mut, "file reference";
        build_file, build_file_mut => BuildFile via as_build_file, as_build_file_mut, "build file";
        build_phase, build_phase_mut => BuildPhase via as_build_phase, as_build_phase_mut, "build phase";
        configuration, configuration_mut => BuildConfiguration via as_configuration, as_configuration_mut, "build configuration";
        configuration_list, configuration_list_mut => ConfigurationList via as_configuration_list, as_configuration_list_mut, "configuration list";
    }

    /// Every modelled reference pointing outside the table
    #[must_use]
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        self.objects
            .iter()
            .flat_map(|(from, object)| {
                object
                    .references()
                    .into_iter()
                    .filter(|to| !self.objects.contains_key(*to))
                    .map(move |to| DanglingReference {
                        from: from.clone(),
                        to: to.clone(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ConfigurationList, Group};

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    fn minimal() -> ProjectGraph {
        let mut objects = IndexMap::new();
        objects.insert(
            id("ROOT"),
            Object::Project(Project {
                main_group: id("MAIN"),
                products_group: None,
                build_configuration_list: id("LIST"),
                targets: Vec::new(),
                extra: Default::default(),
            }),
        );
        objects.insert(id("MAIN"), Object::Group(Group::folder("App")));
        objects.insert(
            id("LIST"),
            Object::ConfigurationList(ConfigurationList::new(Vec::new(), None)),
        );
        ProjectGraph::new(id("ROOT"), objects).unwrap()
    }

    #[test]
    fn rejects_non_project_root() {
        let mut objects = IndexMap::new();
        objects.insert(id("G"), Object::Group(Group::folder("x")));
        assert_eq!(
            ProjectGraph::new(id("G"), objects).unwrap_err(),
            ModelError::InvalidRoot(id("G"))
        );
    }

    #[test]
    fn insert_allocates_unique_ids() {
        let mut graph = minimal();
        let a = graph.insert(Group::folder("a"));
        let b = graph.insert(Group::folder("b"));
        assert_ne!(a, b);
        assert!(graph.contains(&a) && graph.contains(&b));
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn allocation_is_deterministic_per_input() {
        let mut g1 = minimal();
        let mut g2 = minimal();
        assert_eq!(g1.next_id(), g2.next_id());
    }

    #[test]
    fn typed_lookup_checks_kind() {
        let mut graph = minimal();
        assert!(graph.group(&id("MAIN")).is_some());
        assert!(graph.target(&id("MAIN")).is_none());
        assert!(graph.target_mut(&id("MAIN")).is_err());
    }

    #[test]
    fn detects_dangling_references() {
        let mut graph = minimal();
        graph.group_mut(&id("MAIN")).unwrap().children.push(id("GHOST"));
        assert_eq!(
            graph.dangling_references(),
            vec![DanglingReference {
                from: id("MAIN"),
                to: id("GHOST"),
            }]
        );
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut graph = minimal();
        assert_eq!(
            graph.insert_with_id(id("MAIN"), Group::folder("dup")).unwrap_err(),
            ModelError::DuplicateId(id("MAIN"))
        );
    }
}
