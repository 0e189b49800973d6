//! Regex-to-NFA compilation and state canonicalization for generated lexers
//!
//! A [`LexerGrammar`] is compiled one lexical state at a time: every pattern
//! is built into a shared Thompson NFA, epsilon closures are computed, and
//! the closures are collapsed into canonical composite states.  The result
//! is an indexed list of simple states and composites that a code emitter
//! can render directly.

#![deny(
    clippy::disallowed_methods,
    clippy::suspicious,
    clippy::style,
    clippy::clone_on_ref_ptr,
    missing_debug_implementations,
    missing_copy_implementations
)]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]

pub mod chars;
mod closure_builder;
pub mod dot;
pub mod error;
pub mod grammar;
pub mod lexer_data;
pub mod lexical_state;
pub mod nfa;
pub mod re;
pub mod scanner;

pub use error::{BuildError, Diagnostic};
pub use grammar::{LexerGrammar, TokenId, TokenKind, TokenPattern};
pub use lexer_data::LexerData;
pub use lexical_state::LexicalStateData;
pub use scanner::Scanner;
