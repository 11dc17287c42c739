use super::catalog::SchemaCatalog;
use super::ec_class::{ClassId, ClassKind, EcClass, PropertyDef, RelationshipConstraint};

/// Snapshot of a view class taken at the start of a validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewClassDefinition {
    pub class_id: ClassId,
    pub qualified_name: String,
    /// Unqualified class name, used as the compiled fragment's alias
    pub class_name: String,
    pub raw_query_text: String,
    /// Inherited then own properties, without system properties
    pub declared_properties: Vec<PropertyDef>,
    pub is_relationship: bool,
    pub source_constraint: Option<RelationshipConstraint>,
    pub target_constraint: Option<RelationshipConstraint>,
}

impl ViewClassDefinition {
    /// Returns `None` when `class` is not a view class.
    pub fn from_class(catalog: &SchemaCatalog, class: &EcClass) -> Option<Self> {
        let raw_query_text = class.view_query.clone()?;
        Some(ViewClassDefinition {
            class_id: class.id,
            qualified_name: class.qualified_name(),
            class_name: class.name.clone(),
            raw_query_text,
            declared_properties: catalog.declared_properties(class.id),
            is_relationship: class.is_relationship(),
            source_constraint: class.source.clone(),
            target_constraint: class.target.clone(),
        })
    }

    /// All view classes of the catalog, in append order.
    pub fn collect(catalog: &SchemaCatalog) -> Vec<Self> {
        catalog
            .view_classes()
            .filter_map(|c| Self::from_class(catalog, c))
            .collect()
    }

    pub fn kind(&self) -> ClassKind {
        if self.is_relationship {
            ClassKind::Relationship
        } else {
            ClassKind::Entity
        }
    }

    /// System column names this view must return, in slot order.
    pub fn system_columns(&self) -> &'static [&'static str] {
        self.kind().system_property_names()
    }
}
