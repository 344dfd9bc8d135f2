//! Reply-generation trait

use futures::Stream;
use std::pin::Pin;

/// Stream of reply text fragments for one assistant turn
pub type ReplyStream<'a> = Pin<Box<dyn Stream<Item = String> + Send + 'a>>;

/// Reply-generation interface
///
/// Implementations keep a running provider-side conversation history: the
/// user message is appended before generation and the concatenated
/// assistant output is appended when the provider stream ends. The history
/// is per-instance state, so an instance must never be shared between
/// sessions; sharing would leak one caller's conversation into another's.
pub trait ReplyGenerator: Send + Sync + 'static {
    /// Generate one assistant turn as a finite stream of text fragments
    ///
    /// The stream is not restartable; a new turn requires a fresh call.
    /// On provider failure the stream yields exactly one canned fallback
    /// fragment in the target language instead of raising.
    fn generate_response<'a>(&'a self, user_text: &'a str) -> ReplyStream<'a>;

    /// Reset the running history to empty
    fn clear_history(&self);

    /// Model name for logging
    fn model_name(&self) -> &str;
}
