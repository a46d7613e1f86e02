/// Realtime group every administrative client joins.
pub const SYSTEM_GROUP: &str = "System";

/// Suffix appended to a resource id for the administrative view of its children.
pub const ADMIN_GROUP_SUFFIX: &str = "-System";

/// Substituted for stored action parameters that are not valid JSON.
pub const UNPARSEABLE_PARAMETERS_MESSAGE: &str = "Unable to parse action parameters";

/// Largest score a single task may carry.
pub const MAX_TASK_SCORE: i32 = 1_000_000;
