//! Simulated survey interviews with a generative text model as respondent.
//!
//! A [`questionnaire::QuestionCatalog`] is parsed once; an
//! [`interview::InterviewOrchestrator`] then walks it per respondent, asking the
//! questions the [`interview::QuestionScheduler`] hands out and validating every reply
//! before answers are committed. Background documents can be condensed beforehand with
//! the [`documents::DocumentSummarizer`].

pub mod config;
pub mod documents;
pub mod error;
pub mod interview;
pub mod llm;
pub mod persona;
pub mod prompts;
pub mod questionnaire;
pub mod storage;
pub mod telemetry;

pub use error::AppError;
