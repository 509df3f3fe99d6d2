// Synchronizer constants (ADR: No magic values)

/// Default activation ladder (ms) used when an admin view opens all queues
pub const DEFAULT_STAGGER_LADDER_MS: [u64; 7] = [0, 200, 300, 400, 600, 800, 1000];

/// Mutation action names understood by the dashboard backend
pub const ACTION_APPROVE: &str = "approve";
pub const ACTION_REJECT: &str = "reject";
