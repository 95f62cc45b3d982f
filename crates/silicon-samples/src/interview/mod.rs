//! The interview engine: scheduling, dependency resolution, reply validation and the
//! conversation loop that ties them to a text generator.

pub mod answers;
mod batch;
pub mod keys;
mod orchestrator;
pub mod reply;
mod resolver;
mod result;
pub mod scheduler;
mod state;

pub use answers::{Answer, AnswerEntry, AnswerStore};
pub use batch::{BatchError, SampleBatch};
pub use orchestrator::{CancellationFlag, InterviewError, InterviewOrchestrator};
pub use reply::{parse_reply, ReplyBatch, ReplyCheck, ReplyError};
pub use resolver::{relevant_parent_topics, DependencyResolver};
pub use result::InterviewResult;
pub use scheduler::{QuestionScheduler, SchedulerError, ThemeContext, WorkUnit};
pub use state::InterviewState;
