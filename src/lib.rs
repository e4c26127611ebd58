//! Dictionary glue generation for C++ record types.
//!
//! A [`facts::CapabilityQuery`] answers questions about the parsed
//! declarations; [`generate::Generator`] turns each requested type into
//! wrapper functions plus a registration block.
pub mod array_index;
pub mod capability;
pub mod cli;
pub mod config;
pub mod container;
pub mod emit;
pub mod error;
pub mod facts;
pub mod generate;
pub mod jq_exec;
pub mod names;
pub mod path_de;
pub mod request;
pub mod schema;
