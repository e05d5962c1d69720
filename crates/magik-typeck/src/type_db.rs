//! JSON-lines type database loader.
//!
//! Each non-blank line is one JSON object tagged by `instruction`, for
//! example:
//!
//! ```text
//! {"instruction": "type", "type_name": "user:rope", "type_format": "slotted", "slots": [], "parents": ["sw:object"]}
//! {"instruction": "method", "type_name": "user:rope", "method_name": "size", "return_types": ["sw:integer"]}
//! ```
//!
//! Lines that fail to decode are logged and skipped; only I/O failures stop
//! a load.

use std::fs;
use std::path::Path;

use magik_parser::ast::ParameterModifier;
use serde::Deserialize;

use crate::error::TypeDbError;
use crate::registry::{
    BinaryOperator, ConditionDefinition, Exemplar, MethodSignature, Package, ParameterSignature,
    ProcedureSignature, SlotDefinition, TypeFormat, TypeKeeper,
};
use crate::type_string::{ResultString, TypeString, SW_PACKAGE, UNDEFINED_RESULT};

/// Outcome of loading one database.
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// Number of instructions applied.
    pub instructions: usize,
    /// Lines that were skipped.
    pub errors: Vec<TypeDbError>,
}

// ── Wire format ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "instruction", rename_all = "snake_case")]
enum Instruction {
    Package {
        name: String,
        #[serde(default)]
        uses: Vec<String>,
    },
    Type {
        type_name: String,
        #[serde(default)]
        type_format: Option<String>,
        #[serde(default)]
        slots: Vec<SlotEntry>,
        #[serde(default)]
        parents: Vec<String>,
        #[serde(default)]
        doc: Option<String>,
    },
    Method {
        type_name: String,
        method_name: String,
        #[serde(default)]
        modifiers: Vec<String>,
        #[serde(default)]
        parameters: Vec<ParameterEntry>,
        #[serde(default)]
        return_types: Option<ResultTypes>,
        #[serde(default)]
        loop_types: Option<ResultTypes>,
        #[serde(default)]
        doc: Option<String>,
    },
    Procedure {
        name: String,
        #[serde(default)]
        procedure_name: Option<String>,
        #[serde(default)]
        modifiers: Vec<String>,
        #[serde(default)]
        parameters: Vec<ParameterEntry>,
        #[serde(default)]
        return_types: Option<ResultTypes>,
        #[serde(default)]
        loop_types: Option<ResultTypes>,
    },
    Condition {
        name: String,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        data_name_list: Vec<String>,
        #[serde(default)]
        doc: Option<String>,
    },
    BinaryOperator {
        operator: String,
        lhs_type: String,
        rhs_type: String,
        return_type: String,
    },
    Global {
        name: String,
        type_name: String,
    },
}

#[derive(Debug, Deserialize)]
struct SlotEntry {
    name: String,
    type_name: String,
}

#[derive(Debug, Deserialize)]
struct ParameterEntry {
    name: String,
    #[serde(default)]
    modifier: Option<String>,
    #[serde(default)]
    type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultTypes {
    One(String),
    Many(Vec<String>),
}

// ── Loading ────────────────────────────────────────────────────────────

/// Load a type database file into `keeper`.
pub fn read_types(path: &Path, keeper: &mut TypeKeeper) -> Result<LoadSummary, TypeDbError> {
    let text = fs::read_to_string(path).map_err(|source| TypeDbError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let summary = read_types_str(&text, keeper);
    tracing::debug!(
        path = %path.display(),
        instructions = summary.instructions,
        skipped = summary.errors.len(),
        "loaded type database"
    );
    Ok(summary)
}

/// Load type database text into `keeper`.
pub fn read_types_str(text: &str, keeper: &mut TypeKeeper) -> LoadSummary {
    let mut summary = LoadSummary::default();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        match serde_json::from_str::<Instruction>(trimmed) {
            Ok(instruction) => {
                apply(instruction, keeper);
                summary.instructions += 1;
            }
            Err(source) => {
                let error = TypeDbError::Json {
                    line: index + 1,
                    source,
                };
                tracing::error!("skipping type database entry: {error}");
                summary.errors.push(error);
            }
        }
    }
    summary
}

fn apply(instruction: Instruction, keeper: &mut TypeKeeper) {
    match instruction {
        Instruction::Package { name, uses } => keeper.add_package(Package { name, uses }),
        Instruction::Type {
            type_name,
            type_format,
            slots,
            parents,
            doc,
        } => {
            let name = TypeString::parse(&type_name, SW_PACKAGE);
            let package = package_of(&name);
            let exemplar = Exemplar {
                format: type_format
                    .as_deref()
                    .map(parse_format)
                    .unwrap_or_default(),
                slots: slots
                    .into_iter()
                    .map(|slot| SlotDefinition {
                        name: slot.name,
                        type_string: TypeString::parse(&slot.type_name, &package),
                    })
                    .collect(),
                parents: parents
                    .iter()
                    .map(|p| TypeString::parse(p, &package))
                    .collect(),
                doc,
                name,
            };
            keeper.add_exemplar(exemplar);
        }
        Instruction::Method {
            type_name,
            method_name,
            modifiers,
            parameters,
            return_types,
            loop_types,
            doc,
        } => {
            let owner = TypeString::parse(&type_name, SW_PACKAGE);
            let package = package_of(&owner);
            let mut parameters = parameter_signatures(parameters, &package);
            let assignment_parameter = if method_name.ends_with("<<") {
                parameters.pop()
            } else {
                None
            };
            keeper.add_method(MethodSignature {
                owner,
                name: method_name,
                modifiers,
                parameters,
                assignment_parameter,
                result: result_string(return_types, &package),
                loop_result: result_string(loop_types, &package),
                doc,
            });
        }
        Instruction::Procedure {
            name,
            procedure_name,
            modifiers,
            parameters,
            return_types,
            loop_types,
        } => {
            let name = TypeString::parse(&name, SW_PACKAGE);
            let package = package_of(&name);
            keeper.add_procedure(ProcedureSignature {
                parameters: parameter_signatures(parameters, &package),
                result: result_string(return_types, &package),
                loop_result: result_string(loop_types, &package),
                name,
                procedure_name,
                modifiers,
            });
        }
        Instruction::Condition {
            name,
            parent,
            data_name_list,
            doc,
        } => keeper.add_condition(ConditionDefinition {
            name,
            parent,
            data_names: data_name_list,
            doc,
        }),
        Instruction::BinaryOperator {
            operator,
            lhs_type,
            rhs_type,
            return_type,
        } => keeper.add_binary_operator(BinaryOperator {
            operator: operator.to_ascii_lowercase().trim_start_matches('_').to_string(),
            lhs: TypeString::parse(&lhs_type, SW_PACKAGE),
            rhs: TypeString::parse(&rhs_type, SW_PACKAGE),
            result: TypeString::parse(&return_type, SW_PACKAGE),
        }),
        Instruction::Global { name, type_name } => {
            let name = TypeString::parse(&name, SW_PACKAGE);
            let package = package_of(&name);
            keeper.add_global(name, TypeString::parse(&type_name, &package));
        }
    }
}

fn package_of(ts: &TypeString) -> String {
    ts.package().unwrap_or(SW_PACKAGE).to_string()
}

fn parse_format(text: &str) -> TypeFormat {
    match text {
        "slotted" => TypeFormat::Slotted,
        "indexed" => TypeFormat::Indexed,
        "intrinsic" => TypeFormat::Intrinsic,
        other => {
            tracing::warn!(format = other, "unknown type format, assuming intrinsic");
            TypeFormat::Intrinsic
        }
    }
}

fn parameter_signatures(entries: Vec<ParameterEntry>, package: &str) -> Vec<ParameterSignature> {
    entries
        .into_iter()
        .map(|entry| ParameterSignature {
            modifier: match entry.modifier.as_deref() {
                Some("optional") => ParameterModifier::Optional,
                Some("gather") => ParameterModifier::Gather,
                _ => ParameterModifier::None,
            },
            type_string: entry
                .type_name
                .map(|t| TypeString::parse(&t, package))
                .unwrap_or(TypeString::Undefined),
            name: entry.name,
        })
        .collect()
}

fn result_string(types: Option<ResultTypes>, package: &str) -> ResultString {
    match types {
        None => ResultString::Undefined,
        Some(ResultTypes::One(text)) if text.trim() == UNDEFINED_RESULT => ResultString::Undefined,
        Some(ResultTypes::One(text)) => ResultString::parse(&text, package),
        Some(ResultTypes::Many(list)) => {
            ResultString::Types(list.iter().map(|t| TypeString::parse(t, package)).collect())
        }
    }
}
