//! Condition resolution engine.
//!
//! Everything here is a pure function of `(condition, selections, gender,
//! data)`: the UI adapter owns the events, this module owns the semantics,
//! and there is no ambient mutable state in between. Selecting a condition
//! builds a fresh [`Selections`] from the condition's declared defaults;
//! user toggles mutate it through the four transition methods; rendering
//! never mutates anything.
//!
//! Output order is always the declaration order of the condition's
//! prescription groups and items — never the iteration order of a map.

use std::collections::BTreeMap;

use crate::model::{
    Condition, DataSet, ExamSystem, Gender, PrescriptionGroup, PrescriptionItem,
};

/// Literal fallback when neither an override nor a default duration exists.
pub const FALLBACK_DURATION: &str = "3";

/// Placeholder substituted into medication instructions.
pub const DURATION_PLACEHOLDER: &str = "{duration}";

/// Selection state of one prescription item, keyed by `<groupId>-<index>`.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSelection {
    Med {
        med_id: String,
        checked: bool,
    },
    Class {
        class_id: String,
        checked: bool,
        /// Chosen medication within the class. Retained while the item is
        /// unchecked, but excluded from prescription resolution.
        selected: Option<String>,
        /// Duration override declared on the condition's item.
        duration: Option<String>,
    },
}

/// Selection state of one prescription group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupSelection {
    Radio { selected: String },
    Items { items: BTreeMap<String, ItemSelection> },
}

/// Per-condition selection state.
///
/// Built fresh every time a condition is selected; never carried over
/// between conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selections {
    groups: BTreeMap<String, GroupSelection>,
}

/// Key of an item's selection state within its group.
pub fn item_key(group_id: &str, index: usize) -> String {
    format!("{group_id}-{index}")
}

impl Selections {
    /// Initial selection state for a condition.
    ///
    /// Radio groups start on their declared default, falling back to the
    /// first option when the default is empty. Item states mirror each
    /// item's declared `checked`/`default` and carry through any duration
    /// override.
    pub fn for_condition(condition: &Condition) -> Self {
        let mut groups = BTreeMap::new();

        for group in &condition.prescription_groups {
            match group {
                PrescriptionGroup::Radio(radio) => {
                    let selected = if radio.default.is_empty() {
                        radio.options.first().cloned().unwrap_or_default()
                    } else {
                        radio.default.clone()
                    };
                    groups.insert(radio.id.clone(), GroupSelection::Radio { selected });
                }
                PrescriptionGroup::Items(items_group) => {
                    let mut items = BTreeMap::new();
                    for (index, item) in items_group.items.iter().enumerate() {
                        let state = match item {
                            PrescriptionItem::Med { med_id, checked } => ItemSelection::Med {
                                med_id: med_id.clone(),
                                checked: *checked,
                            },
                            PrescriptionItem::Class {
                                class_id,
                                checked,
                                default,
                                duration,
                            } => ItemSelection::Class {
                                class_id: class_id.clone(),
                                checked: *checked,
                                selected: default.clone(),
                                duration: duration.clone(),
                            },
                        };
                        items.insert(item_key(&items_group.id, index), state);
                    }
                    groups.insert(items_group.id.clone(), GroupSelection::Items { items });
                }
            }
        }

        Self { groups }
    }

    pub fn group(&self, group_id: &str) -> Option<&GroupSelection> {
        self.groups.get(group_id)
    }

    /// Radio-group selection: replaces the group's selected medication.
    pub fn select_radio(&mut self, group_id: &str, med_id: impl Into<String>) {
        if let Some(GroupSelection::Radio { selected }) = self.groups.get_mut(group_id) {
            *selected = med_id.into();
        }
    }

    /// Med-item checkbox: sets the item's checked state.
    pub fn toggle_med(&mut self, group_id: &str, key: &str, checked: bool) {
        if let Some(GroupSelection::Items { items }) = self.groups.get_mut(group_id) {
            if let Some(ItemSelection::Med { checked: state, .. }) = items.get_mut(key) {
                *state = checked;
            }
        }
    }

    /// Class-item checkbox: sets the item's checked state. The nested
    /// medication choice is retained either way.
    pub fn toggle_class(&mut self, group_id: &str, key: &str, checked: bool) {
        if let Some(GroupSelection::Items { items }) = self.groups.get_mut(group_id) {
            if let Some(ItemSelection::Class { checked: state, .. }) = items.get_mut(key) {
                *state = checked;
            }
        }
    }

    /// Class-item nested radio: updates the chosen medication within the
    /// class. Only affects the prescription while the item is checked.
    pub fn select_class_med(&mut self, group_id: &str, key: &str, med_id: impl Into<String>) {
        if let Some(GroupSelection::Items { items }) = self.groups.get_mut(group_id) {
            if let Some(ItemSelection::Class { selected, .. }) = items.get_mut(key) {
                *selected = Some(med_id.into());
            }
        }
    }
}

/// One line of the rendered home prescription.
#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionLine {
    pub number: usize,
    pub name: String,
    pub instruction: String,
}

/// Resolves the home prescription for the current selections.
///
/// Walks the condition's prescription groups — and, within an items group,
/// the declared items array — in order, then filters out in-hospital
/// medications and anything not resolving to a known medication, and
/// substitutes the duration placeholder.
pub fn render_prescription(
    condition: &Condition,
    selections: &Selections,
    data: &DataSet,
) -> Vec<PrescriptionLine> {
    let mut picked: Vec<(String, Option<String>)> = Vec::new();

    for group in &condition.prescription_groups {
        match (group, selections.group(group.id())) {
            (PrescriptionGroup::Radio(_), Some(GroupSelection::Radio { selected })) => {
                if !selected.is_empty() {
                    picked.push((selected.clone(), None));
                }
            }
            (PrescriptionGroup::Items(items_group), Some(GroupSelection::Items { items })) => {
                for (index, _) in items_group.items.iter().enumerate() {
                    match items.get(&item_key(&items_group.id, index)) {
                        Some(ItemSelection::Med {
                            med_id,
                            checked: true,
                        }) => picked.push((med_id.clone(), None)),
                        Some(ItemSelection::Class {
                            checked: true,
                            selected: Some(selected),
                            duration,
                            ..
                        }) => picked.push((selected.clone(), duration.clone())),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    picked
        .into_iter()
        .filter_map(|(med_id, duration)| {
            data.medications
                .get(&med_id)
                .filter(|med| !med.in_hospital)
                .map(|med| (med, duration))
        })
        .enumerate()
        .map(|(index, (med, duration))| PrescriptionLine {
            number: index + 1,
            name: med.name.clone(),
            instruction: substitute_duration(
                &med.instruction,
                duration.as_deref(),
                med.default_duration.as_deref(),
            ),
        })
        .collect()
}

fn substitute_duration(
    instruction: &str,
    override_duration: Option<&str>,
    default_duration: Option<&str>,
) -> String {
    if !instruction.contains(DURATION_PLACEHOLDER) {
        return instruction.to_owned();
    }
    let duration = override_duration
        .filter(|d| !d.trim().is_empty())
        .or_else(|| default_duration.filter(|d| !d.trim().is_empty()))
        .unwrap_or(FALLBACK_DURATION);
    instruction.replace(DURATION_PLACEHOLDER, duration)
}

/// Resolves the physical-exam text: the condition's addons in declared
/// order, gendered variants picked by `gender`, one per line.
///
/// A dangling addon reference is skipped here — the validator owns that
/// reporting.
pub fn render_physical_exam(condition: &Condition, gender: Gender, data: &DataSet) -> String {
    condition
        .physical_exam_addons
        .iter()
        .filter_map(|addon_id| data.addons.get(addon_id))
        .map(|addon| addon.text.for_gender(gender))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the conduct list as literal bullets, one per entry, in declared
/// order.
pub fn render_conduct(condition: &Condition) -> String {
    condition
        .conduct
        .iter()
        .map(|entry| format!("- {entry}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything rendered for the currently selected condition.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCondition {
    pub physical_exam: String,
    pub conduct: String,
    pub prescription: Vec<PrescriptionLine>,
}

/// UI-facing session state: current gender, selected condition and its
/// selection state.
///
/// This is the explicit context object a UI adapter drives; selecting a
/// condition always rebuilds the selections from that condition's declared
/// defaults, so nothing carries over between conditions. With no condition
/// selected there is nothing to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    gender: Gender,
    condition_id: Option<String>,
    selections: Selections,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    /// Changing gender only affects text resolution; selections are kept.
    pub fn set_gender(&mut self, gender: Gender) {
        self.gender = gender;
    }

    pub fn condition_id(&self) -> Option<&str> {
        self.condition_id.as_deref()
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn selections_mut(&mut self) -> &mut Selections {
        &mut self.selections
    }

    /// Selects a condition and initializes a fresh selection state for it.
    ///
    /// Returns `false` (leaving the session unchanged) when the id is not a
    /// known condition.
    pub fn select_condition(&mut self, condition_id: &str, data: &DataSet) -> bool {
        let Some(condition) = data.conditions.get(condition_id) else {
            return false;
        };
        self.condition_id = Some(condition_id.to_owned());
        self.selections = Selections::for_condition(condition);
        true
    }

    /// Renders all three sections for the selected condition, or `None`
    /// when no condition is selected.
    pub fn render(&self, data: &DataSet) -> Option<RenderedCondition> {
        let condition = data.conditions.get(self.condition_id.as_deref()?)?;
        Some(RenderedCondition {
            physical_exam: render_physical_exam(condition, self.gender, data),
            conduct: render_conduct(condition),
            prescription: render_prescription(condition, &self.selections, data),
        })
    }
}

/// Per-system variant choices for the systems-based exam.
///
/// A system without an entry here renders its base description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemSelections {
    chosen: BTreeMap<String, String>,
}

impl SystemSelections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choose_variant(&mut self, system_id: impl Into<String>, variant_id: impl Into<String>) {
        self.chosen.insert(system_id.into(), variant_id.into());
    }

    pub fn reset_to_base(&mut self, system_id: &str) {
        self.chosen.remove(system_id);
    }

    pub fn variant_for(&self, system_id: &str) -> Option<&str> {
        self.chosen.get(system_id).map(String::as_str)
    }
}

/// Resolves the systems-based exam: each system's chosen variant (or its
/// base description) in declared order, one per line. Choices are
/// independent across systems.
pub fn render_systems_exam(
    systems: &[ExamSystem],
    selections: &SystemSelections,
    gender: Gender,
) -> String {
    systems
        .iter()
        .map(|system| {
            selections
                .variant_for(&system.id)
                .and_then(|variant_id| system.variants.iter().find(|v| v.id == variant_id))
                .map(|variant| &variant.text)
                .unwrap_or(&system.base)
                .for_gender(gender)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
