//! hdi-gen-compiler
//!
//! Compiles HDI interface definition files into C, C++ and Java marshalling
//! code:
//!  1) a lexer and a header pre-scanner for `.idl` files,
//!  2) a module resolver that orders units by their imports,
//!  3) a recovering recursive-descent parser building an arena-backed AST,
//!  4) a verifier for cross-declaration rules,
//!  5) per-language emitters for proxies, stubs, drivers and custom types,
//!  6) a marshalling interpreter that applies the emitted wire rules to
//!     in-memory values.

pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod error;
pub mod file_detail;
pub mod lexer;
pub mod marshal;
pub mod options;
pub mod package;
pub mod parser;
pub mod resolver;
pub mod token;
pub mod utils;
pub mod verifier;

pub use compiler::{compile, dump, gen_hashes, hash_file, run, RunOutput};
pub use error::{Diagnostic, DiagnosticKind, Diagnostics, HdiError, Result};
pub use options::{BuildTarget, DumpFormat, Language, Options, PackageRoot};
