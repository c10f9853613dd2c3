//! # ediframe: fixed-width EDI codec and framer
//!
//! Decodes and encodes line-oriented, fixed-width EDI files organized as
//! File → Group → Transaction → Record → Field, and checks the redundant counters
//! the format carries in its marker records against what a single forward scan observes.
//!
//! ## Layout of a file
//!
//! ```text
//! HDR...                          file header
//! GRHNWR00001                     group header: transaction type, group code
//! NWR0000000000000000...          transaction 0, record 0
//! SPU0000000000000001...          transaction 0, record 1
//! NWR0000000100000000...          transaction 1, record 0
//! GRT000010000000200000005        group trailer: group code, transaction and record counts
//! TRL000010000000200000007        file trailer: group, transaction and record counts
//! ```
//!
//! Every record starts with a three-character type code. A transaction runs from a line
//! carrying the group's transaction type to the next such line or the group trailer.
//!
//! ## Field kinds
//!
//! - `text(n)`: left-justified, space padded
//! - `numeric(n)`: right-justified, zero padded, blank decodes as absent
//! - `constant(n, "X")`: always encodes its preset; a different value is only a warning
//! - `enum(n) { "C" = "Label", ... }`: closed set of codes
//! - `flag`: `Y` / `N` / `U` (unknown)
//! - `boolean`: `Y` / `N`
//!
//! ## Record layouts
//!
//! Record schemas are registered in a [`Registry`](registry::Registry), in code or from a
//! small DSL:
//!
//! ```text
//! record NWR extends transaction {
//!   title: text(60) mandatory;
//!   language: enum(2) { "EN" = "English", "FR" = "French" };
//!   grand_rights: flag;
//! }
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use ediframe::{EdiFile, Registry};
//!
//! let registry = Registry::from_dsl("record NWR extends transaction { title: text(60); }")?;
//! let text = std::fs::read_to_string("works.v21")?;
//! let mut file = EdiFile::from_text(&text, registry.into_shared())?;
//! while let Some(group) = file.next_group()? {
//!     for transaction in group {
//!         let transaction = transaction?;
//!         println!("{} valid={}", transaction, transaction.is_valid());
//!     }
//! }
//! println!("file valid={}", file.is_valid());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assemble;
pub mod ast;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod parser;
pub mod record;
pub mod registry;
pub mod report;
pub mod schema;
pub mod transaction;
pub mod value;

pub use assemble::FileAssembler;
pub use cursor::{ReadOptions, TextEncoding};
pub use error::{Counter, FrameError, Issue, RecordError, SchemaError, Severity, Status, StructuralError};
pub use frame::{DecodedFile, DecodedGroup, EdiFile, Group, GroupCursor};
pub use record::{FieldView, Record};
pub use registry::{Registry, SchemaLookup};
pub use schema::{FieldKind, FieldSpec, RecordSchema};
pub use transaction::Transaction;
pub use value::Value;
