pub mod catalog;
pub mod ec_class;
pub mod errors;
pub mod view_class;

// Re-export commonly used types
pub use catalog::{split_qualified_name, SchemaCatalog, SchemaInfo};
pub use ec_class::{
    ClassDefinition, ClassId, ClassKind, EcClass, PrimitiveType, PropertyDef, PropertyType,
    RelationshipConstraint, ECCLASSID, ECINSTANCEID, NAV_ID, NAV_REL_ECCLASSID,
    SOURCE_ECCLASSID, SOURCE_ECINSTANCEID, TARGET_ECCLASSID, TARGET_ECINSTANCEID,
};
pub use errors::SchemaError;
pub use view_class::ViewClassDefinition;
