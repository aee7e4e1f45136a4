//! featmatrix-lib: build-matrix orchestration.
//!
//! Given a registry of compile-time feature switches, this crate enumerates
//! every valid combination and builds and tests each one in isolation:
//! - `registry`: the ordered switches and their `requires` edges
//! - `combination` / `plan`: enumeration and the filtered run plan
//! - `filter`: dependency and operator filter rules
//! - `workspace`: build/output directory lifecycle
//! - `toolchain`: the external configure/compile/test operations
//! - `pipeline`: sequential, fail-stop execution
//! - `report`: run accounting and duration formatting

pub mod combination;
pub mod config;
pub mod consts;
pub mod filter;
pub mod pipeline;
pub mod plan;
pub mod registry;
pub mod report;
pub mod toolchain;
pub mod util;
pub mod workspace;
