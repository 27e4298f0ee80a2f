//! Core types for the ragllm provider adapter layer.
//!
//! Defines the data model shared by every provider adapter: the validated
//! [`ProviderConfig`], injectable [`CredentialSource`]s, the sampling
//! parameter tables, function-descriptor normalization, the error taxonomy
//! and the [`Llm`] trait each adapter implements.

pub use config::{AppConfig, ProviderConfig, Section, expand_vars};
pub use credential::{Credentials, CredentialSource, Env, Layered, Secret, StaticSource};
pub use error::{Error, Result};
pub use function::{
    Arg, FunctionCall, FunctionDescriptor, FunctionSchema, FunctionSpec, Signature,
};
pub use id::{Capabilities, ProviderId};
pub use llm::Llm;
pub use request::{CompletionRequest, CompletionResult, Generation, TextStream};
pub use sampling::{Extras, Mapping, MappedParams, Param, ParamTable, Sampling};

pub mod config;
mod credential;
mod error;
pub mod function;
mod id;
mod llm;
mod request;
pub mod sampling;
