//! # PajakGate Core
//!
//! Domain types, the scope-gating matcher, and the answer contract for the
//! PajakGate Indonesian tax assistant.
//!
//! This crate has **no framework dependencies**. The matcher is a pure
//! function over a conversation history and a keyword lexicon; everything
//! that talks to the network implements [`AnswerGenerator`] in another crate.
//!
//! ## Flow
//!
//! HTTP handler → [`ScopeMatcher::evaluate`] → in scope? → [`AnswerGenerator::generate`]
//! → [`parse_model_answer`] → [`TaxAnswer`] back to the client.

pub mod answer;
pub mod error;
pub mod lexicon;
pub mod message;
pub mod scope;

// Re-export key types at crate root for ergonomics
pub use answer::{
    AnswerFormatError, AnswerGenerator, GeneratedAnswer, TaxAnswer, parse_model_answer,
};
pub use error::{Error, ProviderError, Result};
pub use lexicon::Lexicon;
pub use message::{Message, Part, Role};
pub use scope::{ScopeMatch, ScopeMatcher, ScopeVerdict, is_in_scope};
