//! Append-only class table.
//!
//! Classes are stored in an arena indexed by [`ClassId`]; every cross
//! reference (base class, struct type, navigation relationship) is an id or a
//! canonical qualified name, never a pointer. The catalog is cheap to clone
//! (classes are behind `Arc`), which is how a schema import builds its
//! candidate closure without touching the committed one.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ec_class::{
    ClassDefinition, ClassId, ClassKind, EcClass, PropertyDef, PropertyType,
    RelationshipConstraint,
};
use super::errors::SchemaError;

const FIRST_CLASS_ID: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    pub alias: String,
}

impl SchemaInfo {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        SchemaInfo {
            name: name.into(),
            alias: alias.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: Vec<SchemaInfo>,
    classes: Vec<Arc<EcClass>>,
    // lowercase "schema.class" -> id
    by_name: HashMap<String, ClassId>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_schema(&mut self, schema: SchemaInfo) -> Result<(), SchemaError> {
        if self.schema(&schema.name).is_some() {
            return Err(SchemaError::DuplicateSchema {
                schema: schema.name,
            });
        }
        if let Some(existing) = self.schema(&schema.alias) {
            return Err(SchemaError::DuplicateAlias {
                alias: schema.alias.clone(),
                schema: existing.name.clone(),
            });
        }
        self.schemas.push(schema);
        Ok(())
    }

    /// Look up a schema by name or alias, ignoring case.
    pub fn schema(&self, name_or_alias: &str) -> Option<&SchemaInfo> {
        self.schemas.iter().find(|s| {
            s.name.eq_ignore_ascii_case(name_or_alias) || s.alias.eq_ignore_ascii_case(name_or_alias)
        })
    }

    pub fn schemas(&self) -> &[SchemaInfo] {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, id: ClassId) -> Option<&Arc<EcClass>> {
        let index = id.0.checked_sub(FIRST_CLASS_ID)?;
        self.classes.get(index as usize)
    }

    /// All classes in append order.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<EcClass>> {
        self.classes.iter()
    }

    /// View classes in append order.
    pub fn view_classes(&self) -> impl Iterator<Item = &Arc<EcClass>> {
        self.classes.iter().filter(|c| c.is_view())
    }

    /// Resolve `schema_or_alias` + `class_name`, ignoring case.
    pub fn find_class(&self, schema_or_alias: &str, class_name: &str) -> Option<&Arc<EcClass>> {
        let schema = self.schema(schema_or_alias)?;
        let key = name_key(&schema.name, class_name);
        self.by_name.get(&key).and_then(|id| self.get(*id))
    }

    /// Resolve a qualified name in any of the accepted spellings:
    /// `Schema.Class`, `alias.Class`, `Schema:Class`, `[Schema].[Class]`.
    pub fn find_qualified(&self, qualified: &str) -> Option<&Arc<EcClass>> {
        let (schema, class) = split_qualified_name(qualified)?;
        self.find_class(&schema, &class)
    }

    /// System properties, then inherited properties, then own properties.
    pub fn all_properties(&self, id: ClassId) -> Vec<PropertyDef> {
        let Some(class) = self.get(id) else {
            return Vec::new();
        };
        let mut props: Vec<PropertyDef> = class
            .kind
            .system_property_names()
            .iter()
            .map(|name| PropertyDef::system(name))
            .collect();
        props.extend(self.declared_properties(id));
        props
    }

    /// Inherited then own properties, without the system properties.
    pub fn declared_properties(&self, id: ClassId) -> Vec<PropertyDef> {
        let mut chain = Vec::new();
        let mut current = self.get(id);
        while let Some(class) = current {
            chain.push(class);
            current = class.base_class.and_then(|b| self.get(b));
        }
        chain
            .iter()
            .rev()
            .flat_map(|c| c.properties.iter().cloned())
            .collect()
    }

    /// Case-insensitive property lookup across system, inherited and own properties.
    pub fn find_property(&self, id: ClassId, name: &str) -> Option<PropertyDef> {
        self.all_properties(id)
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn derives_from(&self, id: ClassId, base: ClassId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == base {
                return true;
            }
            current = self.get(c).and_then(|class| class.base_class);
        }
        false
    }

    pub fn append(&mut self, definition: ClassDefinition) -> Result<ClassId, SchemaError> {
        let ids = self.append_all(vec![definition])?;
        Ok(ids[0])
    }

    /// Append a batch of classes. References inside the batch may point at
    /// each other in any order, except base classes which must come first.
    /// On error the catalog is left unchanged.
    pub fn append_all(
        &mut self,
        definitions: Vec<ClassDefinition>,
    ) -> Result<Vec<ClassId>, SchemaError> {
        let mut staged = self.clone();

        // Register every name first so struct/navigation/constraint references
        // can point forward within the batch.
        let mut ids = Vec::with_capacity(definitions.len());
        for def in &definitions {
            let schema = staged
                .schema(&def.schema)
                .ok_or_else(|| SchemaError::UnknownSchema {
                    schema: def.schema.clone(),
                })?
                .name
                .clone();
            let key = name_key(&schema, &def.name);
            if staged.by_name.contains_key(&key) {
                return Err(SchemaError::DuplicateClass {
                    class: def.qualified_name(),
                });
            }
            let id = ClassId(FIRST_CLASS_ID + (staged.by_name.len() as u64));
            staged.by_name.insert(key, id);
            ids.push(id);
        }

        let mut kinds: HashMap<ClassId, ClassKind> =
            staged.classes.iter().map(|c| (c.id, c.kind)).collect();
        for (def, id) in definitions.iter().zip(&ids) {
            kinds.insert(*id, def.kind);
        }

        for (def, id) in definitions.into_iter().zip(ids.iter().copied()) {
            let class = staged.resolve_definition(def, id, &kinds)?;
            log::debug!("Catalog: appended class {} ({})", class.qualified_name(), id);
            staged.classes.push(Arc::new(class));
        }

        *self = staged;
        Ok(ids)
    }

    fn resolve_definition(
        &self,
        def: ClassDefinition,
        id: ClassId,
        kinds: &HashMap<ClassId, ClassKind>,
    ) -> Result<EcClass, SchemaError> {
        let qualified = def.qualified_name();
        let schema = self
            .schema(&def.schema)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| def.schema.clone());

        if def.view_query.is_some() && def.kind == ClassKind::Struct {
            return Err(SchemaError::InvalidViewClassKind { class: qualified });
        }

        let base_class = match &def.base_class {
            None => None,
            Some(base) => {
                let base_class = self
                    .find_qualified(base)
                    .ok_or_else(|| SchemaError::UnknownBaseClass {
                        class: qualified.clone(),
                        base: base.clone(),
                    })?;
                if base_class.kind != def.kind {
                    return Err(SchemaError::IncompatibleBaseClass {
                        class: qualified.clone(),
                        base: base.clone(),
                    });
                }
                Some(base_class.id)
            }
        };

        let mut seen: Vec<String> = def
            .kind
            .system_property_names()
            .iter()
            .map(|n| n.to_ascii_lowercase())
            .collect();
        if let Some(base) = base_class {
            seen.extend(
                self.declared_properties(base)
                    .iter()
                    .map(|p| p.name.to_ascii_lowercase()),
            );
        }

        let mut properties = Vec::with_capacity(def.properties.len());
        for mut prop in def.properties {
            let lower = prop.name.to_ascii_lowercase();
            if seen.contains(&lower) {
                return Err(SchemaError::DuplicateProperty {
                    class: qualified.clone(),
                    property: prop.name,
                });
            }
            seen.push(lower);
            prop.is_system = false;
            prop.property_type =
                self.canonical_property_type(&qualified, &prop.name, prop.property_type, kinds)?;
            properties.push(prop);
        }

        let source = self.resolve_constraint(&qualified, "source", def.source)?;
        let target = self.resolve_constraint(&qualified, "target", def.target)?;

        Ok(EcClass {
            id,
            schema,
            name: def.name,
            kind: def.kind,
            base_class,
            properties,
            view_query: def.view_query,
            source,
            target,
        })
    }

    /// Rewrite struct/relationship references to their canonical `Schema.Class` name.
    fn canonical_property_type(
        &self,
        class: &str,
        property: &str,
        property_type: PropertyType,
        kinds: &HashMap<ClassId, ClassKind>,
    ) -> Result<PropertyType, SchemaError> {
        let canonical = |name: &str, expected: ClassKind| -> Option<String> {
            let (schema, class_name) = split_qualified_name(name)?;
            let schema = self.schema(&schema)?;
            let id = self.by_name.get(&name_key(&schema.name, &class_name))?;
            if kinds.get(id) != Some(&expected) {
                return None;
            }
            let canonical_class = self
                .get(*id)
                .map(|c| c.name.clone())
                .unwrap_or(class_name);
            Some(format!("{}.{}", schema.name, canonical_class))
        };

        let unknown_struct = |name: &str| SchemaError::UnknownStructClass {
            class: class.to_string(),
            property: property.to_string(),
            struct_class: name.to_string(),
        };

        Ok(match property_type {
            PropertyType::Struct(name) => PropertyType::Struct(
                canonical(&name, ClassKind::Struct).ok_or_else(|| unknown_struct(&name))?,
            ),
            PropertyType::StructArray(name) => PropertyType::StructArray(
                canonical(&name, ClassKind::Struct).ok_or_else(|| unknown_struct(&name))?,
            ),
            PropertyType::Navigation(name) => PropertyType::Navigation(
                canonical(&name, ClassKind::Relationship).ok_or_else(|| {
                    SchemaError::UnknownRelationshipClass {
                        class: class.to_string(),
                        property: property.to_string(),
                        relationship: name.clone(),
                    }
                })?,
            ),
            other => other,
        })
    }

    fn resolve_constraint(
        &self,
        class: &str,
        end: &'static str,
        constraint: Option<RelationshipConstraint>,
    ) -> Result<Option<RelationshipConstraint>, SchemaError> {
        let Some(constraint) = constraint else {
            return Ok(None);
        };
        for name in &constraint.classes {
            let resolvable = split_qualified_name(name)
                .and_then(|(schema, class_name)| {
                    let schema = self.schema(&schema)?;
                    self.by_name.get(&name_key(&schema.name, &class_name))
                })
                .is_some();
            if !resolvable {
                return Err(SchemaError::UnknownConstraintClass {
                    class: class.to_string(),
                    end,
                    constraint: name.clone(),
                });
            }
        }
        Ok(Some(constraint))
    }
}

fn name_key(schema: &str, class: &str) -> String {
    format!("{}.{}", schema, class).to_ascii_lowercase()
}

/// Split `Schema.Class`, `Schema:Class` or `[Schema].[Class]` into its parts.
pub fn split_qualified_name(qualified: &str) -> Option<(String, String)> {
    let trimmed = qualified.trim();
    let split_at = trimmed.find(['.', ':'])?;
    let (schema, rest) = trimmed.split_at(split_at);
    let class = &rest[1..];
    let schema = crate::utils::identifiers::unquote(schema.trim());
    let class = crate::utils::identifiers::unquote(class.trim());
    if schema.is_empty() || class.is_empty() || class.contains(['.', ':']) {
        return None;
    }
    Some((schema.to_string(), class.to_string()))
}
