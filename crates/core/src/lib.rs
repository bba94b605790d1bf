//! # Plantão Core
//!
//! Core logic for the Plantão clinical-documentation helper:
//!
//! - **Data pipeline**: per-entity JSON source files under `data-src/`
//!   compiled deterministically into consolidated documents under `data/`,
//!   with atomic writes and round-trip splitting.
//! - **Validation**: schema compliance, cross-reference integrity and
//!   compiled/source sync checking, reported as accumulated errors and
//!   warnings.
//! - **Resolution engine**: pure functions turning a selected condition and
//!   the user's toggles into physical-exam text, a conduct list and the home
//!   prescription.
//!
//! **No API concerns**: HTTP servers and CLI entry points live in
//! `api-rest` and `cli`.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod resolve;
pub mod schema;
pub mod schemas;
pub mod validator;

pub use config::{data_dir_from_env_value, CoreConfig, COMPILED_DIR_NAME, DEFAULT_DATA_DIR, SOURCE_DIR_NAME};
pub use error::{DataError, DataResult};
pub use model::{DataSet, Gender};
pub use pipeline::{CompiledPayload, DataPipeline, DataType};
pub use resolve::{Selections, Session};
pub use plantao_types::{DataId, IdError};
pub use validator::{validate_all, ValidationReport};
