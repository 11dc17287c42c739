//! Runtime side of the instance extraction functions.
//!
//! `extract_inst(classId, instanceId)` renders a whole instance as a JSON
//! object; `extract_prop(classId, instanceId, 'Prop')` returns one property.
//! Both read the instance through an [`InstanceReader`] and share one value
//! renderer, so a composite property extracted on its own is the same JSON
//! text as the corresponding member of the full instance.
//!
//! JSON shape:
//! - ids (`ECInstanceId`, `ECClassId`, navigation ids) as `"0x<hex>"`
//! - navigation as `{"Id":..,"RelECClassId":..}`
//! - points as `{"X":..,"Y":..[,"Z":..]}`
//! - binary as `"encoding=base64;<data>"`
//! - dateTime as ISO-8601 with milliseconds
//! - NaN and infinities as `null`
//! - properties without a value are omitted

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::NaiveDateTime;
use log::debug;
use serde_json::{Map, Number, Value};

use crate::schema_catalog::{
    ClassId, PropertyType, SchemaCatalog, ECCLASSID, ECINSTANCEID, NAV_ID, NAV_REL_ECCLASSID,
};

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const BINARY_PREFIX: &str = "encoding=base64;";

/// Stored value of one property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    DateTime(NaiveDateTime),
    Point2d { x: f64, y: f64 },
    Point3d { x: f64, y: f64, z: f64 },
    Navigation { id: u64, rel_class_id: Option<u64> },
    /// Members by name, any order
    Struct(Vec<(String, PropertyValue)>),
    Array(Vec<PropertyValue>),
    /// Instance or class id
    Id(u64),
}

/// Property values of one instance, as read from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceValues {
    pub class_id: ClassId,
    pub instance_id: u64,
    pub values: Vec<(String, PropertyValue)>,
}

impl InstanceValues {
    pub fn new(class_id: ClassId, instance_id: u64) -> Self {
        InstanceValues {
            class_id,
            instance_id,
            values: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.values.push((name.into(), value));
        self
    }

    /// Value of `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        find_member(&self.values, name)
    }
}

fn find_member<'a>(values: &'a [(String, PropertyValue)], name: &str) -> Option<&'a PropertyValue> {
    values
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

pub trait InstanceReader: Send + Sync {
    fn read_instance(&self, class_id: ClassId, instance_id: u64) -> Option<InstanceValues>;
}

/// Instances held in memory, keyed by class and instance id.
#[derive(Debug, Default)]
pub struct InMemoryInstances {
    instances: HashMap<(ClassId, u64), InstanceValues>,
}

impl InMemoryInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: InstanceValues) {
        self.instances
            .insert((instance.class_id, instance.instance_id), instance);
    }
}

impl InstanceReader for InMemoryInstances {
    fn read_instance(&self, class_id: ClassId, instance_id: u64) -> Option<InstanceValues> {
        self.instances.get(&(class_id, instance_id)).cloned()
    }
}

pub fn format_id(id: u64) -> String {
    format!("0x{:x}", id)
}

fn double(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn binary(bytes: &[u8]) -> String {
    format!("{}{}", BINARY_PREFIX, BASE64.encode(bytes))
}

/// Renders instances and property values as JSON.
pub struct InstanceJsonWriter<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> InstanceJsonWriter<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        InstanceJsonWriter { catalog }
    }

    /// Whole instance: system properties, then inherited and own properties
    /// in declaration order.
    pub fn instance_to_json(&self, instance: &InstanceValues) -> Value {
        let mut object = Map::new();
        for property in self.catalog.all_properties(instance.class_id) {
            let value = if property.name == ECINSTANCEID {
                Some(Value::String(format_id(instance.instance_id)))
            } else if property.name == ECCLASSID {
                Some(Value::String(format_id(instance.class_id.0)))
            } else {
                instance
                    .get(&property.name)
                    .and_then(|v| self.value_to_json(v, Some(&property.property_type)))
            };
            if let Some(value) = value {
                object.insert(property.name, value);
            }
        }
        Value::Object(object)
    }

    /// One value. `None` for a null value, which callers omit.
    pub fn value_to_json(&self, value: &PropertyValue, ty: Option<&PropertyType>) -> Option<Value> {
        let json = match value {
            PropertyValue::Null => return None,
            PropertyValue::Boolean(b) => Value::Bool(*b),
            PropertyValue::Integer(i) => Value::from(*i),
            PropertyValue::Long(i) => Value::from(*i),
            PropertyValue::Double(d) => double(*d),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Binary(bytes) => Value::String(binary(bytes)),
            PropertyValue::DateTime(dt) => Value::String(dt.format(DATE_TIME_FORMAT).to_string()),
            PropertyValue::Point2d { x, y } => {
                let mut point = Map::new();
                point.insert("X".to_string(), double(*x));
                point.insert("Y".to_string(), double(*y));
                Value::Object(point)
            }
            PropertyValue::Point3d { x, y, z } => {
                let mut point = Map::new();
                point.insert("X".to_string(), double(*x));
                point.insert("Y".to_string(), double(*y));
                point.insert("Z".to_string(), double(*z));
                Value::Object(point)
            }
            PropertyValue::Navigation { id, rel_class_id } => {
                let mut nav = Map::new();
                nav.insert(NAV_ID.to_string(), Value::String(format_id(*id)));
                if let Some(rel) = rel_class_id {
                    nav.insert(NAV_REL_ECCLASSID.to_string(), Value::String(format_id(*rel)));
                }
                Value::Object(nav)
            }
            PropertyValue::Struct(members) => self.struct_to_json(members, ty),
            PropertyValue::Array(elements) => {
                let element_type = match ty {
                    Some(PropertyType::PrimitiveArray(p)) => Some(PropertyType::Primitive(*p)),
                    Some(PropertyType::StructArray(s)) => Some(PropertyType::Struct(s.clone())),
                    _ => None,
                };
                Value::Array(
                    elements
                        .iter()
                        .map(|e| {
                            self.value_to_json(e, element_type.as_ref())
                                .unwrap_or(Value::Null)
                        })
                        .collect(),
                )
            }
            PropertyValue::Id(id) => Value::String(format_id(*id)),
        };
        Some(json)
    }

    fn struct_to_json(&self, members: &[(String, PropertyValue)], ty: Option<&PropertyType>) -> Value {
        let mut object = Map::new();
        let declared = match ty {
            Some(PropertyType::Struct(name)) => self
                .catalog
                .find_qualified(name)
                .map(|class| self.catalog.declared_properties(class.id)),
            _ => None,
        };
        match declared {
            Some(properties) => {
                for property in properties {
                    let value = find_member(members, &property.name)
                        .and_then(|v| self.value_to_json(v, Some(&property.property_type)));
                    if let Some(value) = value {
                        object.insert(property.name, value);
                    }
                }
            }
            None => {
                for (name, value) in members {
                    if let Some(value) = self.value_to_json(value, None) {
                        object.insert(name.clone(), value);
                    }
                }
            }
        }
        Value::Object(object)
    }
}

/// Result of a scalar function call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    Id(u64),
    /// Composite value, returned as JSON text
    Json(Value),
}

impl ScalarValue {
    /// JSON rendering, identical to the corresponding member of a
    /// full-instance extraction.
    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Null => Value::Null,
            ScalarValue::Boolean(b) => Value::Bool(*b),
            ScalarValue::Integer(i) => Value::from(*i),
            ScalarValue::Double(d) => double(*d),
            ScalarValue::Text(s) => Value::String(s.clone()),
            ScalarValue::Blob(bytes) => Value::String(binary(bytes)),
            ScalarValue::Id(id) => Value::String(format_id(*id)),
            ScalarValue::Json(value) => value.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }
}

/// `extract_inst` / `extract_prop` bound to a catalog and an instance reader.
#[derive(Clone)]
pub struct ExtractionFunctions {
    catalog: Arc<SchemaCatalog>,
    reader: Arc<dyn InstanceReader>,
}

impl ExtractionFunctions {
    pub fn new(catalog: Arc<SchemaCatalog>, reader: Arc<dyn InstanceReader>) -> Self {
        ExtractionFunctions { catalog, reader }
    }

    /// Whole instance as JSON text. `None` (SQL NULL) when the instance does
    /// not exist.
    pub fn extract_inst(&self, class_id: ClassId, instance_id: u64) -> Option<String> {
        let instance = self.reader.read_instance(class_id, instance_id)?;
        let json = InstanceJsonWriter::new(&self.catalog).instance_to_json(&instance);
        Some(json.to_string())
    }

    /// One property, looked up case-insensitively among the class's system,
    /// inherited and own properties. Primitive values come back as raw
    /// scalars, composite values as JSON.
    pub fn extract_prop(&self, class_id: ClassId, instance_id: u64, property: &str) -> ScalarValue {
        let Some(definition) = self.catalog.find_property(class_id, property) else {
            debug!("extract_prop: class {} has no property '{}'", class_id, property);
            return ScalarValue::Null;
        };
        let Some(instance) = self.reader.read_instance(class_id, instance_id) else {
            return ScalarValue::Null;
        };
        if definition.name == ECINSTANCEID {
            return ScalarValue::Id(instance.instance_id);
        }
        if definition.name == ECCLASSID {
            return ScalarValue::Id(instance.class_id.0);
        }
        let Some(value) = instance.get(&definition.name) else {
            return ScalarValue::Null;
        };

        match value {
            PropertyValue::Null => ScalarValue::Null,
            PropertyValue::Boolean(b) => ScalarValue::Boolean(*b),
            PropertyValue::Integer(i) => ScalarValue::Integer(i64::from(*i)),
            PropertyValue::Long(i) => ScalarValue::Integer(*i),
            PropertyValue::Double(d) => ScalarValue::Double(*d),
            PropertyValue::String(s) => ScalarValue::Text(s.clone()),
            PropertyValue::Binary(bytes) => ScalarValue::Blob(bytes.clone()),
            PropertyValue::DateTime(dt) => ScalarValue::Text(dt.format(DATE_TIME_FORMAT).to_string()),
            PropertyValue::Id(id) => ScalarValue::Id(*id),
            composite => InstanceJsonWriter::new(&self.catalog)
                .value_to_json(composite, Some(&definition.property_type))
                .map_or(ScalarValue::Null, ScalarValue::Json),
        }
    }
}
