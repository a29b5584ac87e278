//! Context-owned IR infrastructure: uniqued types and attributes,
//! dialects loaded lazily from a [DialectRegistry](dialect_registry::DialectRegistry),
//! and [Operation](operation::Operation)s organized into
//! [BasicBlock](basic_block::BasicBlock)s and [Region](region::Region)s,
//! all allocated in and owned by a [Context](context::Context).

#[forbid(unsafe_code)]
pub mod attribute;
pub mod basic_block;
pub mod builtin;
pub mod common_traits;
pub mod context;
pub mod debug_info;
pub mod dialect;
pub mod dialect_registry;
pub mod identifier;
pub mod linked_list;
pub mod location;
pub mod op;
pub mod operation;
pub mod printable;
pub mod region;
pub mod result;
pub mod storage_uniquer;
pub mod r#type;
pub mod type_id;
pub mod uniqued_any;
pub mod use_def_lists;
