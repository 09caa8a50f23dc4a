pub mod app;
mod paths;
pub mod reload;

pub use app::{
    run_headless, run_headless_with_metrics, Camera2D, Color, Entity, EntityId, Health, Host,
    HostError, HostResult, InputCollector, InputFeed, InputSnapshot, Key, LoopConfig,
    LoopMetricsSnapshot, LoopSummary, MetricsHandle, NoInput, Pacing, Scene, SceneCommand,
    SceneRunner, SceneWorld, SpriteDesc, StopReason, Tag, Transform, UnknownKeyError, Vec2,
    SLOW_FRAME_ENV_VAR,
};
pub use paths::{resolve_app_paths, AppPaths, StartupError, ROOT_ENV_VAR};
pub use reload::{
    fingerprint_bytes, write_text_atomic, write_text_if_missing, ContentFingerprint, FileWatch,
    ReloadError, WatchEvent,
};
