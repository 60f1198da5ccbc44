//! Application services for task and conversation records.

mod records;

pub use records::{
    CreateConversationRequest, CreateTaskRequest, TaskDetail, TaskRecordService,
    TaskServiceError, TaskServiceResult, UpdateConversationRequest, UpdateTaskRequest,
};
