// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Quitch
//!
//! Database change management for MySQL, compatible with sqitch plans.
//!
//! ## Overview
//!
//! Quitch keeps an ordered plan of schema changes and applies them to a
//! target database, allowing you to:
//!
//! - Describe changes in a `sqitch.plan` file with `deploy/` and `revert/` scripts
//! - Deploy pending changes in plan order
//! - Revert the last deployed change
//! - Detect when the registry has diverged from the plan
//!
//! ## Architecture
//!
//! Every change gets an id that hashes its content together with its
//! parent's id, so the plan forms a hash chain:
//!
//! 1. **Plan**: Parsed from the plan file into changes with ids
//! 2. **Registry**: The changes recorded as deployed on the target
//! 3. **Reconciler**: Checks that the registry is a prefix of the chain
//! 4. **Engine**: Runs scripts and keeps the registry in step
//!
//! ## Modules
//!
//! - [`plan`]: Plan document parsing and the change-id chain
//! - [`reconciler`]: Registry reconciliation against the plan
//! - [`engine`]: Deploy and revert
//! - [`registry`]: Registry backends (MySQL, in-memory)
//! - [`target`]: Target URLs, connections and script execution
//! - [`config`]: Configuration files and settings
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```text
//! %syntax-version=1.0.0
//! %project=flipr
//!
//! users 2024-03-07T03:19:34Z Jane Operator <jane@example.com> # Creates the users table
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod registry;
pub mod target;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, QuitchConfig, Settings};
pub use engine::{ChangeEngine, ExecutionReport};
pub use error::{QuitchError, Result};
pub use plan::{Change, ChangeHasher, FullChange, Plan};
pub use reconciler::{Reconciler, Reconciliation, RegistryStatus, validate_against_plan};
pub use registry::{MemoryRegistry, MySqlRegistry, Registry};
pub use target::{MySqlScriptRunner, MysqlTarget, ScriptLocator, ScriptRunner};
