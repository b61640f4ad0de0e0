//! # tinyagent-gen
//!
//! The generation service behind the agents, treated as an opaque function:
//! prompt string in, continuation string out.
//!
//! ## Core Concepts
//! - **GenerationRequest**: prompt, token budget and stop sequences
//! - **TextGenerator**: trait every backend implements
//! - **Stop sequences**: hard truncation points, enforced by every backend
//! - **Providers**: hosted inference endpoint, local completions server, scripted

pub mod error;
pub mod provider;

pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    truncate_at_stop, CompletionsProvider, GenerationRequest, HfInferenceProvider,
    ProviderConfig, ProviderType, ScriptedGenerator, TextGenerator,
};
