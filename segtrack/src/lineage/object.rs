use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::region::Region;

common::id_type!(ObjectId);

/// Value stored in an object's attribute bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<f64>),
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        AttributeValue::Array(value)
    }
}

/// One node of the lineage graph.
///
/// Relations are ids into the owning [`ObjectGraph`](super::ObjectGraph).
/// Fields are read-only outside the crate; edits go through
/// [`ObjectEditor`](super::ObjectEditor).
#[derive(Debug, Clone)]
pub struct SegmentedObject {
    pub(crate) id: ObjectId,
    /// `None` for frame roots.
    pub(crate) class: Option<usize>,
    pub(crate) frame: u32,
    pub(crate) index: usize,
    pub(crate) region: Region,
    pub(crate) attributes: BTreeMap<String, AttributeValue>,
    pub(crate) measurements: BTreeMap<String, f64>,

    pub(crate) parent: Option<ObjectId>,
    pub(crate) children: BTreeMap<usize, Vec<ObjectId>>,
    pub(crate) previous: Option<ObjectId>,
    pub(crate) next: Option<ObjectId>,
    pub(crate) trackhead: ObjectId,
}

impl SegmentedObject {
    pub(crate) fn new(
        class: Option<usize>,
        frame: u32,
        index: usize,
        region: Region,
        parent: Option<ObjectId>,
    ) -> Self {
        let id = ObjectId::unique();
        Self {
            id,
            class,
            frame,
            index,
            region,
            attributes: BTreeMap::new(),
            measurements: BTreeMap::new(),
            parent,
            children: BTreeMap::new(),
            previous: None,
            next: None,
            trackhead: id,
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn class(&self) -> Option<usize> {
        self.class
    }

    #[inline]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Position among the siblings of the same class.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn measurements(&self) -> &BTreeMap<String, f64> {
        &self.measurements
    }

    pub fn measurement(&self, key: &str) -> Option<f64> {
        self.measurements.get(key).copied()
    }

    #[inline]
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.class.is_none()
    }

    /// Direct children of `class`, in index order.
    pub fn children(&self, class: usize) -> &[ObjectId] {
        self.children.get(&class).map_or(&[], Vec::as_slice)
    }

    /// Classes with at least one direct child.
    pub fn child_classes(&self) -> impl Iterator<Item = usize> + '_ {
        self.children
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(class, _)| *class)
    }

    #[inline]
    pub fn previous(&self) -> Option<ObjectId> {
        self.previous
    }

    #[inline]
    pub fn next(&self) -> Option<ObjectId> {
        self.next
    }

    #[inline]
    pub fn trackhead(&self) -> ObjectId {
        self.trackhead
    }

    pub fn is_trackhead(&self) -> bool {
        self.trackhead == self.id
    }
}
