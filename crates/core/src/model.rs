//! Typed view of the compiled collections.
//!
//! The pipeline moves raw JSON around on purpose; the resolution engine
//! works on these typed entities instead. Prescription groups and items are
//! sum types so every consumer matches them exhaustively.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DataError, DataResult};
use crate::pipeline::{CompiledPayload, DataType};

/// Patient gender, used to pick gendered exam text variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Feminino,
    Masculino,
}

/// Exam text fragment: a single phrasing, or one per gender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddonText {
    Plain(String),
    Gendered { masculino: String, feminino: String },
}

impl AddonText {
    pub fn for_gender(&self, gender: Gender) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Gendered {
                masculino,
                feminino,
            } => match gender {
                Gender::Masculino => masculino,
                Gender::Feminino => feminino,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    /// Patient-facing instruction; may embed the `{duration}` placeholder.
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_duration: Option<String>,
    /// Administered in-hospital; never part of the home prescription.
    #[serde(default)]
    pub in_hospital: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationClass {
    pub label: String,
    /// Ordered medication IDs offered by this class.
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamAddon {
    pub label: String,
    pub text: AddonText,
}

/// One entry of an items prescription group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PrescriptionItem {
    /// A standalone medication with a pre-checked state.
    #[serde(rename = "med", rename_all = "camelCase")]
    Med {
        med_id: String,
        #[serde(default)]
        checked: bool,
    },
    /// A choice among the medications of a class.
    #[serde(rename = "class", rename_all = "camelCase")]
    Class {
        class_id: String,
        #[serde(default)]
        checked: bool,
        /// Pre-selected medication; must belong to the class's options.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        /// Duration override applied when this item resolves.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioGroup {
    pub id: String,
    pub label: String,
    /// Mutually exclusive medication IDs.
    pub options: Vec<String>,
    #[serde(default)]
    pub default: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsGroup {
    pub id: String,
    pub label: String,
    /// Independently toggleable items.
    pub items: Vec<PrescriptionItem>,
}

/// A named bundle of medication choices attached to a condition.
///
/// Radio groups carry a `"type": "radio"` discriminator on the wire; items
/// groups are recognised by their `items` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrescriptionGroup {
    Radio(RadioGroup),
    Items(ItemsGroup),
}

impl PrescriptionGroup {
    pub fn id(&self) -> &str {
        match self {
            Self::Radio(group) => &group.id,
            Self::Items(group) => &group.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Radio(group) => &group.label,
            Self::Items(group) => &group.label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub name: String,
    #[serde(default)]
    pub physical_exam_addons: Vec<String>,
    #[serde(default)]
    pub conduct: Vec<String>,
    #[serde(default)]
    pub prescription_groups: Vec<PrescriptionGroup>,
}

/// A selectable phrasing of one body system's exam description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamVariant {
    pub id: String,
    pub label: String,
    pub text: AddonText,
}

/// One body system of the systems-based exam: a base description plus
/// optional named variants, selectable independently per system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSystem {
    pub id: String,
    pub label: String,
    pub base: AddonText,
    #[serde(default)]
    pub variants: Vec<ExamVariant>,
}

/// The four typed collections the resolution engine reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    pub medications: BTreeMap<String, Medication>,
    pub medication_classes: BTreeMap<String, MedicationClass>,
    pub addons: BTreeMap<String, ExamAddon>,
    pub conditions: BTreeMap<String, Condition>,
}

impl DataSet {
    /// Types a compiled payload, naming the offending entry on failure.
    pub fn from_payload(payload: &CompiledPayload) -> DataResult<Self> {
        Ok(Self {
            medications: typed_entries("medications", payload.entries(DataType::Medications))?,
            medication_classes: typed_entries(
                "medication-classes",
                payload.entries(DataType::MedicationClasses),
            )?,
            addons: typed_entries("physical-exam", payload.entries(DataType::PhysicalExam))?,
            conditions: typed_entries("conditions", payload.entries(DataType::Conditions))?,
        })
    }
}

fn typed_entries<T: DeserializeOwned>(
    collection: &'static str,
    entries: &BTreeMap<String, Value>,
) -> DataResult<BTreeMap<String, T>> {
    entries
        .iter()
        .map(|(id, value)| {
            serde_json::from_value(value.clone())
                .map(|typed| (id.clone(), typed))
                .map_err(|source| DataError::MalformedEntry {
                    collection,
                    id: id.clone(),
                    source,
                })
        })
        .collect()
}
