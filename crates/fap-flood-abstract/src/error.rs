use thiserror::Error;

/// Setup-time failures. Every variant invalidates an invariant that the
/// classification stage assumes, so setup aborts instead of continuing with
/// a half-built scenario.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("client {0} is assigned to more than one role set")]
    RoleOverlap(u32),

    #[error("client {0} belongs to no role set")]
    RoleUnassigned(u32),

    #[error("role sets reference client {0}, but the scenario only has {1} clients")]
    RoleOutOfRange(u32, u32),

    #[error("unknown entity id {0}")]
    UnknownEntity(u32),

    #[error("device for client entity {0} could not be resolved")]
    DeviceNotFound(u32),

    #[error(
        "attack window {start_us}..{stop_us} us must be strictly inside the \
         simulation window 0..{sim_stop_us} us"
    )]
    AttackWindowOutOfBounds {
        start_us: u64,
        stop_us: u64,
        sim_stop_us: u64,
    },

    #[error("attack window starts at {start_us} us, before the {warmup_us} us warm-up ends")]
    AttackBeforeWarmup { start_us: u64, warmup_us: u64 },
}
