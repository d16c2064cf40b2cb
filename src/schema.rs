//! Schema data model attached to views.
//!
//! A view refers to the data shape it accepts or produces through a
//! [`SchemaRef`]: either a use of a shared, named [`SchemaClass`] or an inline
//! [`FieldMap`] that exists only for that one use. Field-level validation is
//! not modelled here; only what the document generator needs to describe the
//! shape is kept.

use std::sync::Arc;

/// The kind of value a field holds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    /// Free-form object
    Dict,
    /// Any value
    Raw,
    /// Homogeneous list of the inner field
    List(Box<FieldSpec>),
    /// Another schema, optionally as a list of it
    Nested { schema: Box<SchemaRef>, many: bool },
}

/// A single field declaration.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub required: bool,
    pub allow_none: bool,
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            allow_none: false,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    pub fn datetime() -> Self {
        Self::new(FieldKind::DateTime)
    }

    pub fn list(inner: FieldSpec) -> Self {
        Self::new(FieldKind::List(Box::new(inner)))
    }

    pub fn nested(schema: impl Into<SchemaRef>) -> Self {
        Self::new(FieldKind::Nested {
            schema: Box::new(schema.into()),
            many: false,
        })
    }

    pub fn nested_many(schema: impl Into<SchemaRef>) -> Self {
        Self::new(FieldKind::Nested {
            schema: Box::new(schema.into()),
            many: true,
        })
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allow_none(mut self) -> Self {
        self.allow_none = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ordered mapping of field name to field declaration.
///
/// Declaration order is kept so generated `properties` read in the order the
/// author wrote them. Re-declaring a name replaces the earlier field in place.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: Vec<(String, FieldSpec)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((name, spec)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, spec)| spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A reusable schema definition.
///
/// Classes are shared through `Arc`; the allocation is the class identity, so
/// two separately built classes are distinct even when their contents match.
#[derive(Debug)]
pub struct SchemaClass {
    name: String,
    description: Option<String>,
    fields: FieldMap,
    register: bool,
}

impl SchemaClass {
    pub fn new(name: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
            register: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Always inline this schema instead of registering it as a component.
    pub fn unregistered(mut self) -> Self {
        self.register = false;
        self
    }

    pub fn shared(self) -> Arc<SchemaClass> {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn is_registrable(&self) -> bool {
        self.register
    }
}

/// One use of a [`SchemaClass`], with the modifiers in effect for that use.
#[derive(Debug, Clone)]
pub struct SchemaHandle {
    class: Arc<SchemaClass>,
    only: Option<Vec<String>>,
    partial: bool,
    many: bool,
}

impl SchemaHandle {
    pub fn new(class: Arc<SchemaClass>) -> Self {
        Self {
            class,
            only: None,
            partial: false,
            many: false,
        }
    }

    /// Restrict the active fields to the given subset.
    pub fn only<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Make every field optional.
    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    /// Describe a list of the schema rather than a single object.
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    pub fn class(&self) -> &Arc<SchemaClass> {
        &self.class
    }

    pub fn only_fields(&self) -> Option<&[String]> {
        self.only.as_deref()
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    pub fn same_class(&self, other: &Arc<SchemaClass>) -> bool {
        Arc::ptr_eq(&self.class, other)
    }
}

/// Reference to the schema a view validates against or marshals with.
#[derive(Debug, Clone)]
pub enum SchemaRef {
    Named(SchemaHandle),
    Inline(FieldMap),
}

impl From<SchemaHandle> for SchemaRef {
    fn from(handle: SchemaHandle) -> Self {
        SchemaRef::Named(handle)
    }
}

impl From<Arc<SchemaClass>> for SchemaRef {
    fn from(class: Arc<SchemaClass>) -> Self {
        SchemaRef::Named(SchemaHandle::new(class))
    }
}

impl From<&Arc<SchemaClass>> for SchemaRef {
    fn from(class: &Arc<SchemaClass>) -> Self {
        SchemaRef::Named(SchemaHandle::new(Arc::clone(class)))
    }
}

impl From<FieldMap> for SchemaRef {
    fn from(fields: FieldMap) -> Self {
        SchemaRef::Inline(fields)
    }
}
