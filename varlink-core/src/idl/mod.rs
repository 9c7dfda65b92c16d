//! The Varlink interface definition language: scanner, recursive-descent
//! parser and the resulting typed AST (§3, §4.1, §4.2).

mod interface;
mod parser;
mod scanner;
mod type_;

pub use interface::{Interface, Member};
pub use parser::parse;
pub use type_::{Field, Type};
