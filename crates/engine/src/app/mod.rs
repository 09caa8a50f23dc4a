mod host;
mod input;
mod loop_runner;
mod metrics;
mod scene;

pub use host::{Color, Health, Host, HostError, HostResult, SpriteDesc, Tag};
pub use input::{InputCollector, Key, UnknownKeyError};
pub use loop_runner::{
    run_headless, run_headless_with_metrics, InputFeed, LoopConfig, LoopSummary, NoInput, Pacing,
    StopReason, SLOW_FRAME_ENV_VAR,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use scene::{
    Camera2D, Entity, EntityId, InputSnapshot, Scene, SceneCommand, SceneRunner, SceneWorld,
    Transform, Vec2,
};
