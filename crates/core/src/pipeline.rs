//! Source → compiled data pipeline.
//!
//! The authoritative representation of the reference data is one JSON file
//! per entity under `data-src/<type>/<id>.json`. The pipeline compiles those
//! trees into one consolidated document per collection under `data/`, and
//! supports the reverse split for round-tripping. Compiled documents are a
//! derived, disposable cache: every write path ends in a full recompile so
//! the on-disk documents always equal the deterministic compilation of the
//! current source set.
//!
//! All file writes go through a temp-file-plus-rename sequence in the target
//! directory; the rename is the atomic commit point, so a reader never
//! observes a partially written document.
//!
//! The pipeline is deliberately permissive about entry *content*: it moves
//! raw JSON values around without typing them, so referentially broken
//! intermediate states can still be saved and show up in the
//! [validator](crate::validator) report instead of failing the compile.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use plantao_types::DataId;
use serde_json::{json, Value};

use crate::config::CoreConfig;
use crate::error::{DataError, DataResult};

/// The four reference data collections.
///
/// This enum is deliberately *closed*: every pipeline operation is scoped by
/// one of these types, and an unknown type string fails fast with
/// [`DataError::InvalidType`] before any file is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Medications,
    MedicationClasses,
    PhysicalExam,
    Conditions,
}

impl DataType {
    /// All collection types, in compilation order.
    pub const ALL: [DataType; 4] = [
        DataType::Medications,
        DataType::MedicationClasses,
        DataType::PhysicalExam,
        DataType::Conditions,
    ];

    /// The wire/CLI name of the type, also its source directory name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Medications => "medications",
            Self::MedicationClasses => "medication-classes",
            Self::PhysicalExam => "physical-exam",
            Self::Conditions => "conditions",
        }
    }

    /// Filename of the compiled document for this type.
    pub const fn compiled_file_name(self) -> &'static str {
        match self {
            Self::Medications => "medications.json",
            Self::MedicationClasses => "medication-classes.json",
            Self::PhysicalExam => "physical-exam.json",
            Self::Conditions => "conditions.json",
        }
    }

    /// Physical-exam wraps its entry mapping under `addons` in the compiled
    /// document; the other collections are persisted as a bare mapping.
    pub const fn wraps_addons(self) -> bool {
        matches!(self, Self::PhysicalExam)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medications" => Ok(Self::Medications),
            "medication-classes" => Ok(Self::MedicationClasses),
            "physical-exam" => Ok(Self::PhysicalExam),
            "conditions" => Ok(Self::Conditions),
            other => Err(DataError::InvalidType(other.to_owned())),
        }
    }
}

/// The in-memory result of compiling every source tree.
///
/// Entry maps are `BTreeMap`s keyed by entity ID: identifiers are restricted
/// to `[a-z0-9-]`, where byte-wise ordering is already a total deterministic
/// order, so plain `Ord` doubles as the stable comparator the compiled
/// documents guarantee.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledPayload {
    pub medications: BTreeMap<String, Value>,
    pub medication_classes: BTreeMap<String, Value>,
    pub physical_exam_addons: BTreeMap<String, Value>,
    pub conditions: BTreeMap<String, Value>,
}

impl CompiledPayload {
    /// The raw entries of one collection.
    pub fn entries(&self, data_type: DataType) -> &BTreeMap<String, Value> {
        match data_type {
            DataType::Medications => &self.medications,
            DataType::MedicationClasses => &self.medication_classes,
            DataType::PhysicalExam => &self.physical_exam_addons,
            DataType::Conditions => &self.conditions,
        }
    }

    /// The document persisted for one collection (physical-exam wrapped).
    pub fn compiled_document(&self, data_type: DataType) -> Value {
        let mapping = Value::Object(self.entries(data_type).clone().into_iter().collect());
        if data_type.wraps_addons() {
            json!({ "addons": mapping })
        } else {
            mapping
        }
    }
}

/// Filesystem-backed pipeline over one data root.
#[derive(Debug, Clone)]
pub struct DataPipeline {
    cfg: CoreConfig,
}

impl DataPipeline {
    pub fn new(cfg: CoreConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Source directory for one collection type.
    pub fn source_type_dir(&self, data_type: DataType) -> PathBuf {
        self.cfg.source_dir().join(data_type.as_str())
    }

    /// Path of a single source entry file.
    pub fn source_entry_path(&self, data_type: DataType, id: &DataId) -> PathBuf {
        self.source_type_dir(data_type).join(format!("{id}.json"))
    }

    /// Path of the compiled document for one collection type.
    pub fn compiled_file_path(&self, data_type: DataType) -> PathBuf {
        self.cfg.compiled_dir().join(data_type.compiled_file_name())
    }

    /// Reads every source entry of one collection, keyed by filename stem.
    ///
    /// A filename stem that violates the ID grammar fails the whole read:
    /// malformed data must never silently disappear from the compiled
    /// output. Files without a `.json` extension are not entries and are
    /// left for the validator to report.
    pub fn read_source_type(&self, data_type: DataType) -> DataResult<BTreeMap<String, Value>> {
        let dir = self.source_type_dir(data_type);
        ensure_dir(&dir)?;

        let mut result = BTreeMap::new();
        for name in list_file_names(&dir)? {
            let Some(id) = name.strip_suffix(".json") else {
                continue;
            };
            if !DataId::is_valid(id) {
                return Err(DataError::InvalidSourceFilename {
                    id: id.to_owned(),
                    dir,
                });
            }

            let path = dir.join(&name);
            let content = fs::read_to_string(&path).map_err(|source| DataError::FileRead {
                path: path.clone(),
                source,
            })?;
            let value: Value =
                serde_json::from_str(&content).map_err(|source| DataError::Parse { path, source })?;
            result.insert(id.to_owned(), value);
        }

        Ok(result)
    }

    /// Assembles the full payload from all four source trees.
    pub fn build_compiled_payload(&self) -> DataResult<CompiledPayload> {
        Ok(CompiledPayload {
            medications: self.read_source_type(DataType::Medications)?,
            medication_classes: self.read_source_type(DataType::MedicationClasses)?,
            physical_exam_addons: self.read_source_type(DataType::PhysicalExam)?,
            conditions: self.read_source_type(DataType::Conditions)?,
        })
    }

    /// Compiles the source trees and atomically rewrites all four compiled
    /// documents.
    pub fn compile_from_source(&self) -> DataResult<CompiledPayload> {
        let payload = self.build_compiled_payload()?;
        let compiled_dir = self.cfg.compiled_dir();
        ensure_dir(&compiled_dir)?;

        for data_type in DataType::ALL {
            write_json_atomic(
                &self.compiled_file_path(data_type),
                &payload.compiled_document(data_type),
            )?;
        }

        tracing::debug!(
            medications = payload.medications.len(),
            medication_classes = payload.medication_classes.len(),
            physical_exam_addons = payload.physical_exam_addons.len(),
            conditions = payload.conditions.len(),
            "compiled data-src into data"
        );

        Ok(payload)
    }

    /// Writes a single source entry atomically. Does not recompile.
    pub fn write_source_entry(
        &self,
        data_type: DataType,
        id: &DataId,
        entry: &Value,
    ) -> DataResult<()> {
        ensure_dir(&self.source_type_dir(data_type))?;
        write_json_atomic(&self.source_entry_path(data_type, id), entry)
    }

    /// Deletes a single source entry.
    ///
    /// Returns `Ok(false)` when the entry did not exist: a missing entry is
    /// a normal negative result, not an error.
    pub fn delete_source_entry(&self, data_type: DataType, id: &DataId) -> DataResult<bool> {
        let path = self.source_entry_path(data_type, id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DataError::FileDelete { path, source }),
        }
    }

    /// Parses the persisted compiled document for one collection type.
    pub fn read_compiled_file(&self, data_type: DataType) -> DataResult<Value> {
        let path = self.compiled_file_path(data_type);
        let content = fs::read_to_string(&path).map_err(|source| DataError::FileRead {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| DataError::Parse { path, source })
    }

    /// The compiled-equivalent view of one collection, derived from source.
    pub fn compiled_view(&self, data_type: DataType) -> DataResult<Value> {
        let mapping = Value::Object(self.read_source_type(data_type)?.into_iter().collect());
        Ok(if data_type.wraps_addons() {
            json!({ "addons": mapping })
        } else {
            mapping
        })
    }

    /// Splits the persisted compiled documents back into per-entity source
    /// files (the round-trip inverse of [`Self::compile_from_source`]).
    ///
    /// Existing `.json` entries in each source directory are cleared first.
    /// Returns the number of entries written per collection type.
    pub fn split_compiled_to_source(&self) -> DataResult<Vec<(DataType, usize)>> {
        let mut counts = Vec::with_capacity(DataType::ALL.len());

        for data_type in DataType::ALL {
            let document = self.read_compiled_file(data_type)?;
            let entries = if data_type.wraps_addons() {
                document.get("addons").cloned().unwrap_or_else(|| json!({}))
            } else {
                document
            };
            let entries = entries
                .as_object()
                .cloned()
                .unwrap_or_default();

            let dir = self.source_type_dir(data_type);
            ensure_dir(&dir)?;
            clear_json_files(&dir)?;

            for (id, entry) in &entries {
                let id = DataId::new(id)?;
                write_json_atomic(&self.source_entry_path(data_type, &id), entry)?;
            }

            counts.push((data_type, entries.len()));
        }

        Ok(counts)
    }
}

fn ensure_dir(dir: &Path) -> DataResult<()> {
    fs::create_dir_all(dir).map_err(|source| DataError::DirCreation {
        dir: dir.to_path_buf(),
        source,
    })
}

/// Lists entry names of a directory in a deterministic order.
fn list_file_names(dir: &Path) -> DataResult<Vec<String>> {
    let read_dir = fs::read_dir(dir).map_err(|source| DataError::DirRead {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| DataError::DirRead {
            dir: dir.to_path_buf(),
            source,
        })?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn clear_json_files(dir: &Path) -> DataResult<()> {
    for name in list_file_names(dir)? {
        if name.ends_with(".json") {
            let path = dir.join(name);
            fs::remove_file(&path).map_err(|source| DataError::FileDelete { path, source })?;
        }
    }
    Ok(())
}

/// Serializes a value the way every persisted document is written:
/// pretty-printed, two-space indent, trailing newline.
pub(crate) fn to_pretty_json(value: &Value) -> DataResult<String> {
    let mut serialized = serde_json::to_string_pretty(value)?;
    serialized.push('\n');
    Ok(serialized)
}

/// Writes a JSON document atomically: the serialized bytes go to a uniquely
/// named temp file in the target directory, and the rename over the target
/// is the commit point.
fn write_json_atomic(path: &Path, value: &Value) -> DataResult<()> {
    let serialized = to_pretty_json(value)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let file_write = |source| DataError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(file_write)?;
    temp.write_all(serialized.as_bytes()).map_err(file_write)?;
    temp.persist(path).map_err(|e| file_write(e.error))?;
    Ok(())
}
