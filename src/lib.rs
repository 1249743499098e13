//! A self-contained scanner, lexer, parser, printer, and tree-walking
//! evaluator for a small Lua-5.1-flavored scripting language.
//!
//! The pipeline stages are independently usable: [`lexer::Lexer`] turns
//! source text into a token stream, [`parser::parse`] turns a token stream
//! into an AST plus diagnostics, [`printer::print`] turns an AST back into
//! surface text, and [`evaluator::evaluate`] walks the AST directly. None of
//! the stages depend on a surrounding host application; the crate has no
//! notion of a plugin registry or public façade beyond these entry points.

pub mod ast;
pub mod diagnostics;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod scanner;
pub mod stdlib;
pub mod tokens;
pub mod value;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use evaluator::{evaluate, EvalError, Evaluator, EvaluatorOptions, RuntimeError};
pub use lexer::{Lexer, LexerOptions};
pub use parser::{parse, Parser, ParserOptions};
pub use printer::{print, PrinterOptions};
pub use scanner::{ScanError, Scanner};
pub use value::Value;
