//! Review orchestration around a local Ollama model.
//!
//! Provides prompt construction, the always-answering generation client,
//! effort extraction from model output, and the [`pipeline::ReviewService`]
//! that sequences persistence and generation for reviews and follow-up
//! questions.

pub mod effort;
pub mod llm;
pub mod pipeline;
pub mod prompt;

#[cfg(test)]
mod testing;
