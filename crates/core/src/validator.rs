//! Reference data validation.
//!
//! The validator's job is to report *everything* wrong with the data set in
//! one pass, so none of the checks here fail fast. Findings accumulate into
//! a [`ValidationReport`] with two severities:
//!
//! - **errors** — unsafe or broken data: schema violations, dangling
//!   references, stale compiled documents, malformed source layout;
//! - **warnings** — soft issues that do not block use: duplicates, missing
//!   recommended fields.
//!
//! Only genuine I/O or parse failures while assembling the payload abort
//! validation with a [`DataError`](crate::DataError).

use std::collections::BTreeSet;
use std::fs;

use plantao_types::DataId;
use serde_json::Value;

use crate::error::{DataError, DataResult};
use crate::pipeline::{CompiledPayload, DataPipeline, DataType};
use crate::schema::validate_against_schema;
use crate::schemas::schema_for;

/// Remediation hint appended to sync-check findings.
const RECOMPILE_HINT: &str = "run: plantao compile";

/// Accumulated validation findings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether the data set is safe to use. Warnings alone do not fail.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs every validation pass over the current source and compiled trees.
pub fn validate_all(pipeline: &DataPipeline) -> DataResult<ValidationReport> {
    let mut report = ValidationReport::default();

    validate_source_layout(pipeline, &mut report)?;

    let payload = pipeline.build_compiled_payload()?;
    validate_schema_compliance(&payload, &mut report);
    validate_cross_references(&payload, &mut report);
    validate_compiled_sync(pipeline, &payload, &mut report);

    Ok(report)
}

/// Every source file must be `.json` with a slug stem, and no source
/// directory may be empty (an empty directory would silently ship an empty
/// collection).
pub fn validate_source_layout(
    pipeline: &DataPipeline,
    report: &mut ValidationReport,
) -> DataResult<()> {
    for data_type in DataType::ALL {
        let dir = pipeline.source_type_dir(data_type);
        fs::create_dir_all(&dir).map_err(|source| DataError::DirCreation {
            dir: dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|source| DataError::DirRead {
            dir: dir.clone(),
            source,
        })? {
            let entry = entry.map_err(|source| DataError::DirRead {
                dir: dir.clone(),
                source,
            })?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let mut json_entries = 0usize;
        for name in &names {
            let Some(stem) = name.strip_suffix(".json") else {
                report.errors.push(format!(
                    "data-src/{}/{}: only .json files are allowed",
                    data_type.as_str(),
                    name
                ));
                continue;
            };
            json_entries += 1;
            if !DataId::is_valid(stem) {
                report.errors.push(format!(
                    "data-src/{}/{}: invalid ID format",
                    data_type.as_str(),
                    name
                ));
            }
        }

        if json_entries == 0 {
            report
                .errors
                .push(format!("data-src/{}: folder is empty", data_type.as_str()));
        }
    }

    Ok(())
}

/// Runs the schema validator over every entry of every collection.
pub fn validate_schema_compliance(payload: &CompiledPayload, report: &mut ValidationReport) {
    for data_type in DataType::ALL {
        let schema = schema_for(data_type);
        for (id, entry) in payload.entries(data_type) {
            let path = format!("{}.{}", data_type.as_str(), id);
            report
                .errors
                .extend(validate_against_schema(entry, schema, &path));
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn str_items(value: Option<&Value>) -> Vec<&str> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Cross-reference integrity over the assembled payload.
///
/// Shape problems are the schema pass's concern; this pass stays permissive
/// about missing or mistyped fields and only reports reference-level issues.
pub fn validate_cross_references(payload: &CompiledPayload, report: &mut ValidationReport) {
    let medications = &payload.medications;
    let classes = &payload.medication_classes;
    let addons = &payload.physical_exam_addons;

    for (id, med) in medications {
        let instruction = non_empty_str(med.get("instruction")).unwrap_or_default();
        if instruction.contains("{duration}") && non_empty_str(med.get("defaultDuration")).is_none()
        {
            report.errors.push(format!(
                "medications.{id}: instruction uses {{duration}} but defaultDuration is missing"
            ));
        }
        if med.get("inHospital") == Some(&Value::Bool(true))
            && non_empty_str(med.get("hospitalNote")).is_none()
        {
            report.warnings.push(format!(
                "medications.{id}: inHospital=true but hospitalNote is empty"
            ));
        }
    }

    for (id, class) in classes {
        let mut seen = BTreeSet::new();
        for med_id in str_items(class.get("options")) {
            if !medications.contains_key(med_id) {
                report.errors.push(format!(
                    "medication-classes.{id}: unknown medication \"{med_id}\""
                ));
            }
            if !seen.insert(med_id) {
                report.warnings.push(format!(
                    "medication-classes.{id}: duplicate option \"{med_id}\""
                ));
            }
        }
    }

    for (id, condition) in &payload.conditions {
        let mut addon_seen = BTreeSet::new();
        for addon_id in str_items(condition.get("physicalExamAddons")) {
            if !addons.contains_key(addon_id) {
                report.errors.push(format!(
                    "conditions.{id}: unknown physical exam addon \"{addon_id}\""
                ));
            }
            if !addon_seen.insert(addon_id) {
                report.warnings.push(format!(
                    "conditions.{id}: duplicate physical exam addon \"{addon_id}\""
                ));
            }
        }

        let groups = condition
            .get("prescriptionGroups")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let group_ids: Vec<&str> = groups
            .iter()
            .filter_map(|g| non_empty_str(g.get("id")))
            .collect();
        let mut reported = BTreeSet::new();
        for (index, group_id) in group_ids.iter().enumerate() {
            if group_ids[..index].contains(group_id) && reported.insert(*group_id) {
                report.errors.push(format!(
                    "conditions.{id}: duplicate prescription group id \"{group_id}\""
                ));
            }
        }

        for group in groups {
            let group_id = non_empty_str(group.get("id")).unwrap_or("?");

            if group.get("type").and_then(Value::as_str) == Some("radio") {
                let options = str_items(group.get("options"));
                for med_id in &options {
                    if !medications.contains_key(*med_id) {
                        report.errors.push(format!(
                            "conditions.{id}: group \"{group_id}\" unknown medication \"{med_id}\""
                        ));
                    }
                }
                if let Some(default) = non_empty_str(group.get("default")) {
                    if !options.contains(&default) {
                        report.errors.push(format!(
                            "conditions.{id}: group \"{group_id}\" default \"{default}\" is not in options"
                        ));
                    }
                }
                continue;
            }

            let items = group
                .get("items")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for (index, item) in items.iter().enumerate() {
                match item.get("type").and_then(Value::as_str) {
                    Some("med") => {
                        let med_id = non_empty_str(item.get("medId")).unwrap_or_default();
                        if !medications.contains_key(med_id) {
                            report.errors.push(format!(
                                "conditions.{id}: group \"{group_id}\" item {index} unknown medication \"{med_id}\""
                            ));
                        }
                    }
                    Some("class") => {
                        let class_id = non_empty_str(item.get("classId")).unwrap_or_default();
                        match classes.get(class_id) {
                            None => {
                                report.errors.push(format!(
                                    "conditions.{id}: group \"{group_id}\" item {index} unknown class \"{class_id}\""
                                ));
                            }
                            Some(class) => {
                                if let Some(default) = non_empty_str(item.get("default")) {
                                    if !str_items(class.get("options")).contains(&default) {
                                        report.errors.push(format!(
                                            "conditions.{id}: group \"{group_id}\" item {index} default \"{default}\" is not in class \"{class_id}\""
                                        ));
                                    }
                                }
                            }
                        }
                    }
                    other => {
                        report.errors.push(format!(
                            "conditions.{id}: group \"{group_id}\" item {index} invalid type \"{}\"",
                            other.unwrap_or_default()
                        ));
                    }
                }
            }
        }
    }
}

/// Each persisted compiled document must equal the deterministic compilation
/// of the current source tree.
pub fn validate_compiled_sync(
    pipeline: &DataPipeline,
    payload: &CompiledPayload,
    report: &mut ValidationReport,
) {
    for data_type in DataType::ALL {
        let file_name = data_type.compiled_file_name();
        match pipeline.read_compiled_file(data_type) {
            Ok(document) => {
                if document != payload.compiled_document(data_type) {
                    report.errors.push(format!(
                        "data/{file_name} is out of sync with data-src ({RECOMPILE_HINT})"
                    ));
                }
            }
            Err(_) => {
                report.errors.push(format!(
                    "data/{file_name} is missing or unreadable ({RECOMPILE_HINT})"
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn pipeline(temp: &TempDir) -> DataPipeline {
        DataPipeline::new(CoreConfig::new(temp.path().to_path_buf()))
    }

    fn id(raw: &str) -> DataId {
        DataId::new(raw).unwrap()
    }

    fn write(p: &DataPipeline, data_type: DataType, raw_id: &str, entry: Value) {
        p.write_source_entry(data_type, &id(raw_id), &entry).unwrap();
    }

    /// A complete, internally consistent data set.
    fn seed_clean(p: &DataPipeline) {
        write(
            p,
            DataType::Medications,
            "dipirona",
            json!({
                "name": "Dipirona 500mg",
                "instruction": "Tomar 1 comprimido de 6/6 horas por {duration} dias",
                "defaultDuration": "5"
            }),
        );
        write(
            p,
            DataType::Medications,
            "loratadina",
            json!({ "name": "Loratadina 10mg", "instruction": "Tomar 1 comprimido ao dia" }),
        );
        write(
            p,
            DataType::Medications,
            "ceftriaxona",
            json!({
                "name": "Ceftriaxona 1g",
                "instruction": "Aplicar 1g IM dose única",
                "inHospital": true,
                "hospitalNote": "aplicado no pronto atendimento"
            }),
        );
        write(
            p,
            DataType::MedicationClasses,
            "antialergicos",
            json!({ "label": "Antialérgico", "options": ["loratadina"] }),
        );
        write(
            p,
            DataType::PhysicalExam,
            "orofaringe",
            json!({ "label": "Orofaringe", "text": "Orofaringe hiperemiada." }),
        );
        write(
            p,
            DataType::Conditions,
            "amigdalite",
            json!({
                "name": "Amigdalite",
                "physicalExamAddons": ["orofaringe"],
                "conduct": ["Hidratação", "Retorno se piora"],
                "prescriptionGroups": [
                    {
                        "id": "antibiotico",
                        "label": "Antibiótico",
                        "type": "radio",
                        "options": ["ceftriaxona"],
                        "default": "ceftriaxona"
                    },
                    {
                        "id": "sintomaticos",
                        "label": "Sintomáticos",
                        "items": [
                            { "type": "med", "medId": "dipirona", "checked": true },
                            {
                                "type": "class",
                                "classId": "antialergicos",
                                "checked": false,
                                "default": "loratadina"
                            }
                        ]
                    }
                ]
            }),
        );
    }

    #[test]
    fn clean_data_set_passes_with_no_findings() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        seed_clean(&p);
        p.compile_from_source().unwrap();

        let report = validate_all(&p).unwrap();
        assert!(report.is_ok(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    }

    #[test]
    fn dangling_class_option_is_exactly_one_error() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        seed_clean(&p);
        write(
            &p,
            DataType::MedicationClasses,
            "antitermicos",
            json!({ "label": "Antitérmico", "options": ["paracetamol"] }),
        );
        p.compile_from_source().unwrap();

        let report = validate_all(&p).unwrap();
        assert_eq!(
            report.errors,
            vec!["medication-classes.antitermicos: unknown medication \"paracetamol\""]
        );
    }

    #[test]
    fn duration_placeholder_requires_default_duration() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        seed_clean(&p);
        write(
            &p,
            DataType::Medications,
            "azitromicina",
            json!({ "name": "Azitromicina 500mg", "instruction": "Tomar por {duration} dias" }),
        );
        p.compile_from_source().unwrap();

        let report = validate_all(&p).unwrap();
        assert_eq!(
            report.errors,
            vec![
                "medications.azitromicina: instruction uses {duration} but defaultDuration is missing"
            ]
        );
    }

    #[test]
    fn hospital_med_without_note_warns() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        seed_clean(&p);
        write(
            &p,
            DataType::Medications,
            "hidrocortisona",
            json!({
                "name": "Hidrocortisona 100mg",
                "instruction": "Aplicar EV",
                "inHospital": true
            }),
        );
        p.compile_from_source().unwrap();

        let report = validate_all(&p).unwrap();
        assert!(report.is_ok());
        assert_eq!(
            report.warnings,
            vec!["medications.hidrocortisona: inHospital=true but hospitalNote is empty"]
        );
    }

    #[test]
    fn duplicates_warn_but_do_not_fail() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        seed_clean(&p);
        write(
            &p,
            DataType::MedicationClasses,
            "antialergicos",
            json!({ "label": "Antialérgico", "options": ["loratadina", "loratadina"] }),
        );
        write(
            &p,
            DataType::Conditions,
            "rinite",
            json!({
                "name": "Rinite",
                "physicalExamAddons": ["orofaringe", "orofaringe"],
                "conduct": [],
                "prescriptionGroups": []
            }),
        );
        p.compile_from_source().unwrap();

        let report = validate_all(&p).unwrap();
        assert!(report.is_ok(), "errors: {:?}", report.errors);
        assert_eq!(
            report.warnings,
            vec![
                "medication-classes.antialergicos: duplicate option \"loratadina\"",
                "conditions.rinite: duplicate physical exam addon \"orofaringe\"",
            ]
        );
    }

    #[test]
    fn condition_reference_errors_are_reported() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        seed_clean(&p);
        write(
            &p,
            DataType::Conditions,
            "faringite",
            json!({
                "name": "Faringite",
                "physicalExamAddons": ["inexistente"],
                "conduct": [],
                "prescriptionGroups": [
                    {
                        "id": "grupo",
                        "label": "A",
                        "type": "radio",
                        "options": ["dipirona"],
                        "default": "loratadina"
                    },
                    {
                        "id": "grupo",
                        "label": "B",
                        "items": [
                            { "type": "med", "medId": "fantasma", "checked": true },
                            { "type": "class", "classId": "antialergicos", "checked": true, "default": "dipirona" },
                            { "type": "class", "classId": "sem-classe", "checked": false },
                            { "type": "outro" }
                        ]
                    }
                ]
            }),
        );
        p.compile_from_source().unwrap();

        let report = validate_all(&p).unwrap();
        let expected = [
            "conditions.faringite: unknown physical exam addon \"inexistente\"",
            "conditions.faringite: duplicate prescription group id \"grupo\"",
            "conditions.faringite: group \"grupo\" default \"loratadina\" is not in options",
            "conditions.faringite: group \"grupo\" item 0 unknown medication \"fantasma\"",
            "conditions.faringite: group \"grupo\" item 1 default \"dipirona\" is not in class \"antialergicos\"",
            "conditions.faringite: group \"grupo\" item 2 unknown class \"sem-classe\"",
            "conditions.faringite: group \"grupo\" item 3 invalid type \"outro\"",
        ];
        for finding in expected {
            assert!(
                report.errors.iter().any(|e| e == finding),
                "missing finding {finding:?} in {:?}",
                report.errors
            );
        }
    }

    #[test]
    fn empty_source_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        seed_clean(&p);
        let dir = p.source_type_dir(DataType::MedicationClasses);
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::create_dir_all(&dir).unwrap();
        p.compile_from_source().unwrap();

        let report = validate_all(&p).unwrap();
        assert!(report
            .errors
            .contains(&"data-src/medication-classes: folder is empty".to_string()));
    }

    #[test]
    fn non_json_file_and_bad_stem_are_layout_errors() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        seed_clean(&p);
        let dir = p.source_type_dir(DataType::PhysicalExam);
        std::fs::write(dir.join("notes.txt"), "x").unwrap();
        std::fs::write(dir.join("Ruim_Id.json"), "{}").unwrap();
        p.compile_from_source().ok(); // bad stem fails the compile; layout pass still reports

        let mut report = ValidationReport::default();
        validate_source_layout(&p, &mut report).unwrap();
        assert!(report
            .errors
            .contains(&"data-src/physical-exam/notes.txt: only .json files are allowed".to_string()));
        assert!(report
            .errors
            .contains(&"data-src/physical-exam/Ruim_Id.json: invalid ID format".to_string()));
    }

    #[test]
    fn edited_compiled_document_is_the_only_sync_error() {
        let temp = TempDir::new().unwrap();
        let p = pipeline(&temp);
        seed_clean(&p);
        p.compile_from_source().unwrap();

        // hand-edit the compiled conditions document without touching data-src
        let path = p.compiled_file_path(DataType::Conditions);
        let mut doc = p.read_compiled_file(DataType::Conditions).unwrap();
        doc["amigdalite"]["name"] = json!("Amigdalite aguda");
        std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        let report = validate_all(&p).unwrap();
        assert_eq!(
            report.errors,
            vec!["data/conditions.json is out of sync with data-src (run: plantao compile)"]
        );
    }
}
