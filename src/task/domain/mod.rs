//! Domain model for task claiming and processing.
//!
//! Tasks move `pending -> processing -> completed | failed`. Only a claim
//! enters `processing`, and only the owning instance leaves it. The domain
//! keeps these rules free of any storage concern; adapters enforce the same
//! rules atomically against their backing store.

mod conversation;
mod error;
mod ids;
mod instance;
mod outcome;
mod stats;
mod task;

pub use conversation::{
    Conversation, ConversationContent, ConversationStatus, ConversationUpdate, NewConversation,
    PersistedConversationData,
};
pub use error::{
    ParseConversationStatusError, ParseInstanceIdError, ParseTaskStatusError, TaskDomainError,
};
pub use ids::{ConversationId, TaskId};
pub use instance::InstanceId;
pub use outcome::ExecutionOutcome;
pub use stats::QueueStats;
pub use task::{
    NewTask, PersistedTaskData, Task, TaskStatus, TaskStatusCounts, TaskSummary, TaskTitle,
    TaskUpdate,
};
