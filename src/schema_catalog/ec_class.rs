//! Class and property definitions.
//!
//! A [`ClassDefinition`] is what the schema importer hands us (references by
//! qualified name). Once appended to the [`SchemaCatalog`](super::SchemaCatalog)
//! it becomes an immutable [`EcClass`] with a [`ClassId`] and resolved base
//! class.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog-assigned class identifier, rendered as `0x<hex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u64);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

pub const ECINSTANCEID: &str = "ECInstanceId";
pub const ECCLASSID: &str = "ECClassId";
pub const SOURCE_ECINSTANCEID: &str = "SourceECInstanceId";
pub const SOURCE_ECCLASSID: &str = "SourceECClassId";
pub const TARGET_ECINSTANCEID: &str = "TargetECInstanceId";
pub const TARGET_ECCLASSID: &str = "TargetECClassId";

/// Navigation property members
pub const NAV_ID: &str = "Id";
pub const NAV_REL_ECCLASSID: &str = "RelECClassId";

const ENTITY_SYSTEM_PROPERTIES: [&str; 2] = [ECINSTANCEID, ECCLASSID];
const RELATIONSHIP_SYSTEM_PROPERTIES: [&str; 6] = [
    ECINSTANCEID,
    ECCLASSID,
    SOURCE_ECINSTANCEID,
    SOURCE_ECCLASSID,
    TARGET_ECINSTANCEID,
    TARGET_ECCLASSID,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveType {
    Binary,
    Boolean,
    DateTime,
    Double,
    Integer,
    Long,
    String,
    Point2d,
    Point3d,
    Geometry,
}

impl PrimitiveType {
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveType::Binary => "binary",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::DateTime => "dateTime",
            PrimitiveType::Double => "double",
            PrimitiveType::Integer => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::String => "string",
            PrimitiveType::Point2d => "point2d",
            PrimitiveType::Point3d => "point3d",
            PrimitiveType::Geometry => "geometry",
        }
    }

    /// Resolve a schema type name (`int`, `dateTime`, ...), case-insensitive.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let ty = match lower.as_str() {
            "binary" => PrimitiveType::Binary,
            "boolean" => PrimitiveType::Boolean,
            "datetime" => PrimitiveType::DateTime,
            "double" => PrimitiveType::Double,
            "int" => PrimitiveType::Integer,
            "long" => PrimitiveType::Long,
            "string" => PrimitiveType::String,
            "point2d" => PrimitiveType::Point2d,
            "point3d" => PrimitiveType::Point3d,
            "geometry" => PrimitiveType::Geometry,
            _ => return None,
        };
        Some(ty)
    }

    /// Resolve a `CAST(... AS <target>)` type name. Accepts the SQL spellings
    /// ECSQL tolerates in addition to the schema names.
    pub fn from_cast_target(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let ty = match lower.as_str() {
            "binary" | "blob" => PrimitiveType::Binary,
            "boolean" | "bool" => PrimitiveType::Boolean,
            "datetime" | "timestamp" => PrimitiveType::DateTime,
            "double" | "real" | "float" => PrimitiveType::Double,
            "int" | "integer" | "int32" => PrimitiveType::Integer,
            "long" | "int64" | "bigint" => PrimitiveType::Long,
            "string" | "text" | "varchar" => PrimitiveType::String,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, PrimitiveType::Integer | PrimitiveType::Long)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Integer | PrimitiveType::Long | PrimitiveType::Double
        )
    }

    pub fn is_point(&self) -> bool {
        matches!(self, PrimitiveType::Point2d | PrimitiveType::Point3d)
    }

    /// Coordinate member names of a point type (`X`, `Y`[, `Z`]).
    pub fn point_members(&self) -> &'static [&'static str] {
        match self {
            PrimitiveType::Point2d => &["X", "Y"],
            PrimitiveType::Point3d => &["X", "Y", "Z"],
            _ => &[],
        }
    }
}

/// Type of a property (and of a resolved query column).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Primitive(PrimitiveType),
    /// Struct property; holds the qualified struct class name.
    Struct(String),
    /// Navigation property; holds the qualified relationship class name.
    Navigation(String),
    PrimitiveArray(PrimitiveType),
    StructArray(String),
}

impl PropertyType {
    /// Type name used when comparing declared and returned types and in messages.
    pub fn type_name(&self) -> String {
        match self {
            PropertyType::Primitive(p) => p.type_name().to_string(),
            PropertyType::Struct(name) => name.clone(),
            PropertyType::Navigation(_) => "navigation".to_string(),
            PropertyType::PrimitiveArray(p) => format!("{}[]", p.type_name()),
            PropertyType::StructArray(name) => format!("{}[]", name),
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, PropertyType::Navigation(_))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            PropertyType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Two types match when their type names are equal, ignoring case.
    pub fn matches(&self, other: &PropertyType) -> bool {
        self.type_name().eq_ignore_ascii_case(&other.type_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub property_type: PropertyType,
    #[serde(default)]
    pub is_system: bool,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        PropertyDef {
            name: name.into(),
            property_type,
            is_system: false,
        }
    }

    pub fn primitive(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self::new(name, PropertyType::Primitive(primitive))
    }

    pub fn navigation(name: impl Into<String>, relationship: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Navigation(relationship.into()))
    }

    pub fn structure(name: impl Into<String>, struct_class: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Struct(struct_class.into()))
    }

    pub(crate) fn system(name: &str) -> Self {
        PropertyDef {
            name: name.to_string(),
            property_type: PropertyType::Primitive(PrimitiveType::Long),
            is_system: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    Entity,
    Relationship,
    Struct,
}

impl ClassKind {
    /// System property names in their fixed column order.
    pub fn system_property_names(&self) -> &'static [&'static str] {
        match self {
            ClassKind::Entity => &ENTITY_SYSTEM_PROPERTIES,
            ClassKind::Relationship => &RELATIONSHIP_SYSTEM_PROPERTIES,
            ClassKind::Struct => &[],
        }
    }

    pub fn is_system_property(&self, name: &str) -> bool {
        self.system_property_names()
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
    }
}

/// One end of a relationship class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipConstraint {
    /// Qualified names of the constraint classes
    pub classes: Vec<String>,
    #[serde(default)]
    pub polymorphic: bool,
}

impl RelationshipConstraint {
    pub fn new(class: impl Into<String>) -> Self {
        RelationshipConstraint {
            classes: vec![class.into()],
            polymorphic: true,
        }
    }
}

/// Class definition as supplied by the schema importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub schema: String,
    pub name: String,
    pub kind: ClassKind,
    #[serde(default)]
    pub base_class: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    /// Present for view classes
    #[serde(default)]
    pub view_query: Option<String>,
    #[serde(default)]
    pub source: Option<RelationshipConstraint>,
    #[serde(default)]
    pub target: Option<RelationshipConstraint>,
}

impl ClassDefinition {
    pub fn entity(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(schema, name, ClassKind::Entity)
    }

    pub fn relationship(
        schema: impl Into<String>,
        name: impl Into<String>,
        source: RelationshipConstraint,
        target: RelationshipConstraint,
    ) -> Self {
        let mut def = Self::with_kind(schema, name, ClassKind::Relationship);
        def.source = Some(source);
        def.target = Some(target);
        def
    }

    pub fn structure(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(schema, name, ClassKind::Struct)
    }

    fn with_kind(schema: impl Into<String>, name: impl Into<String>, kind: ClassKind) -> Self {
        ClassDefinition {
            schema: schema.into(),
            name: name.into(),
            kind,
            base_class: None,
            properties: Vec::new(),
            view_query: None,
            source: None,
            target: None,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base_class = Some(base.into());
        self
    }

    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_primitive(self, name: &str, primitive: PrimitiveType) -> Self {
        self.with_property(PropertyDef::primitive(name, primitive))
    }

    pub fn with_view_query(mut self, query: impl Into<String>) -> Self {
        self.view_query = Some(query.into());
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Class as stored in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct EcClass {
    pub id: ClassId,
    pub schema: String,
    pub name: String,
    pub kind: ClassKind,
    pub base_class: Option<ClassId>,
    /// Own properties, in declaration order
    pub properties: Vec<PropertyDef>,
    pub view_query: Option<String>,
    pub source: Option<RelationshipConstraint>,
    pub target: Option<RelationshipConstraint>,
}

impl EcClass {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn is_view(&self) -> bool {
        self.view_query.is_some()
    }

    pub fn is_relationship(&self) -> bool {
        self.kind == ClassKind::Relationship
    }
}
