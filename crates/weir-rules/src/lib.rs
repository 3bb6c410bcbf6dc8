//! Rule language front end.
//!
//! A rule source file is a whitespace-separated sequence of filter rules:
//!
//! ```text
//! permit out proto {tcp, udp} to {1.1.1.0/24, 10.0.0.0/8} port 443
//! block in all
//! ```
//!
//! The pipeline is lexer → parser (which validates as it goes) → ruleset
//! tree → lowering into engine-ready filter records. A failed parse yields
//! nothing; rules are never partially installed from a bad source file.

mod ast;
mod error;
mod lexer;
mod lower;
mod parser;
mod token;

pub use ast::{
    Action, Direction, FilterConditions, FilterRule, IpAddresses, IpVersion, Ruleset, Transport,
};
pub use error::ParseError;
pub use lexer::Lexer;
pub use lower::{install_ruleset, lower_filter, InstallSummary, RULE_WEIGHT};
pub use parser::Parser;
pub use token::{SourceLocation, Token, TokenKind};
