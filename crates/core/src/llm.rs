//! The adapter trait.

use crate::{Capabilities, CompletionRequest, Error, Generation, ProviderId, Result, TextStream};

/// A constructed provider adapter.
///
/// Adapters are validated at construction and hold their credential and
/// mapped parameters for their lifetime. They keep no per-call state, so a
/// single instance may be shared across concurrent calls.
pub trait Llm: Clone + Send + Sync {
    /// The provider this adapter talks to.
    fn id(&self) -> ProviderId;

    /// What the adapter supports.
    fn capabilities(&self) -> Capabilities;

    /// Generate the full completion.
    fn generate(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<Generation>> + Send;

    /// Stream the completion as text fragments.
    ///
    /// Request errors surface as the first item of the stream.
    fn stream(&self, request: &CompletionRequest) -> TextStream;

    /// Fail with [`Error::UnsupportedParameter`] if `request` needs a
    /// capability this adapter lacks.
    fn check(&self, request: &CompletionRequest, stream: bool) -> Result<()> {
        let caps = self.capabilities();
        if stream && !caps.stream {
            return Err(Error::unsupported(self.id(), "stream"));
        }
        if !request.functions.is_empty() {
            if !caps.functions {
                return Err(Error::unsupported(self.id(), "functions"));
            }
            if stream {
                return Err(Error::unsupported(self.id(), "functions with stream"));
            }
        }
        Ok(())
    }
}
