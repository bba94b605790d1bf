//! The fixed entity schemas, embedded at compile time.

use std::sync::LazyLock;

use serde_json::Value;

use crate::pipeline::DataType;

static MEDICATION: LazyLock<Value> = LazyLock::new(|| parse(include_str!("../schemas/medication.schema.json")));
static MEDICATION_CLASS: LazyLock<Value> =
    LazyLock::new(|| parse(include_str!("../schemas/medication-class.schema.json")));
static PHYSICAL_EXAM_ADDON: LazyLock<Value> =
    LazyLock::new(|| parse(include_str!("../schemas/physical-exam-addon.schema.json")));
static CONDITION: LazyLock<Value> = LazyLock::new(|| parse(include_str!("../schemas/condition.schema.json")));

fn parse(raw: &str) -> Value {
    serde_json::from_str(raw).expect("embedded schema is valid JSON")
}

/// The entity schema used to validate entries of one collection.
pub fn schema_for(data_type: DataType) -> &'static Value {
    match data_type {
        DataType::Medications => &MEDICATION,
        DataType::MedicationClasses => &MEDICATION_CLASS,
        DataType::PhysicalExam => &PHYSICAL_EXAM_ADDON,
        DataType::Conditions => &CONDITION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_schemas_parse_as_objects() {
        for data_type in DataType::ALL {
            assert!(schema_for(data_type).is_object(), "{data_type} schema");
        }
    }
}
