//! Diesel schema for task and conversation persistence.

diesel::table! {
    /// Task records claimed and processed by worker instances.
    tasks (id) {
        /// Store-assigned task identifier.
        id -> Int8,
        /// Task title.
        #[max_length = 255]
        title -> Varchar,
        /// Optional task description.
        description -> Nullable<Text>,
        /// Task lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last transition timestamp.
        updated_at -> Timestamptz,
        /// Terminal transition timestamp.
        processed_at -> Nullable<Timestamptz>,
        /// Instance currently or most recently owning the task.
        #[max_length = 255]
        processing_instance_id -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Conversations owned by a task.
    conversations (id) {
        /// Store-assigned conversation identifier.
        id -> Int8,
        /// Owning task.
        task_id -> Int8,
        /// Opaque payload.
        content -> Text,
        /// Conversation status.
        #[max_length = 50]
        status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(conversations -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, conversations);
