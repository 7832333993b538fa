//! Utility modules for extract-recipe.
//!
//! # Modules
//!
//! - [`tokenize`]: Slash command tokenizer used for context-break detection

pub mod tokenize;

pub use tokenize::{split_slash_command, SlashCommand};
