//! Data models for the cached tables.
//!
//! - `Record`: the trait the engine is generic over
//! - `User`, `Student`, `Session`: people and the signed-in identity
//! - `Material`, `Submission`: coursework
//! - `Settings`: the singleton preferences row
//! - `TableName`: the fixed set of tables

pub mod coursework;
pub mod people;
pub mod record;
pub mod settings;
pub mod table;

pub use coursework::{Material, Submission};
pub use people::{Session, Student, User};
pub use record::{assign_id, record_id, Record};
pub use settings::{Settings, SETTINGS_ID};
pub use table::TableName;
