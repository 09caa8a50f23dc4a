use std::env;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::input::InputCollector;
use super::metrics::MetricsWindow;
use super::scene::{SceneCommand, SceneRunner};
use super::{MetricsHandle, Scene, Vec2};

pub const SLOW_FRAME_ENV_VAR: &str = "GRIDRUN_SLOW_FRAME_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Frames follow the wall clock and sleep to hold `target_tps`.
    RealTime,
    /// Every frame advances exactly one fixed step without sleeping.
    Unpaced,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_ticks: Option<u64>,
    pub pacing: Pacing,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_ticks: None,
            pacing: Pacing::RealTime,
        }
    }
}

/// Source of raw key transitions for a headless run. Called once before
/// every simulation tick.
pub trait InputFeed {
    fn feed(&mut self, tick: u64, input: &mut InputCollector);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl InputFeed for NoInput {
    fn feed(&mut self, _tick: u64, _input: &mut InputCollector) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuitRequested,
    SceneQuit,
    TickLimit,
}

impl StopReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopReason::QuitRequested => "quit_requested",
            StopReason::SceneQuit => "scene_quit",
            StopReason::TickLimit => "tick_limit",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoopSummary {
    pub ticks_run: u64,
    pub frames_run: u64,
    pub stop_reason: StopReason,
    pub final_title: Option<String>,
    pub final_entity_count: usize,
    pub final_camera_position: Vec2,
}

pub fn run_headless(
    config: &LoopConfig,
    scene: Box<dyn Scene>,
    input_feed: &mut dyn InputFeed,
) -> LoopSummary {
    run_headless_with_metrics(config, scene, input_feed, MetricsHandle::default())
}

pub fn run_headless_with_metrics(
    config: &LoopConfig,
    scene: Box<dyn Scene>,
    input_feed: &mut dyn InputFeed,
    metrics_handle: MetricsHandle,
) -> LoopSummary {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);

    let mut runner = SceneRunner::new(scene);
    runner.load();
    runner.apply_pending();
    info!(
        title = runner.debug_title().as_deref().unwrap_or("-"),
        entity_count = runner.world().entity_count(),
        "scene_loaded"
    );
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        max_ticks = ?config.max_ticks,
        pacing = ?config.pacing,
        "loop_config"
    );

    let mut input_collector = InputCollector::new();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_window = MetricsWindow::new(metrics_log_interval);
    let mut ticks_run = 0u64;
    let mut frames_run = 0u64;

    let stop_reason = 'frames: loop {
        let frame_start = Instant::now();
        if config.pacing == Pacing::RealTime && slow_frame_delay > Duration::ZERO {
            // Explicit debug perturbation only; this is not the pacing sleep.
            thread::sleep(slow_frame_delay);
        }

        let now = Instant::now();
        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
        last_frame_instant = now;
        let frame_dt = match config.pacing {
            Pacing::RealTime => clamp_frame_delta(raw_frame_dt, max_frame_delta),
            Pacing::Unpaced => fixed_dt,
        };
        accumulator = accumulator.saturating_add(frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            input_feed.feed(ticks_run, &mut input_collector);
            if input_collector.quit_requested() {
                info!(reason = "escape_key", tick = ticks_run, "shutdown_requested");
                break 'frames StopReason::QuitRequested;
            }

            let input_snapshot = input_collector.snapshot_for_tick();
            let tick_start = Instant::now();
            let command = runner.update(fixed_dt_seconds, &input_snapshot);
            runner.apply_pending();
            metrics_window.record_tick(tick_start.elapsed());
            ticks_run = ticks_run.saturating_add(1);

            match command {
                SceneCommand::Quit => {
                    info!(reason = "scene", tick = ticks_run, "shutdown_requested");
                    break 'frames StopReason::SceneQuit;
                }
                SceneCommand::None => {}
            }

            if config.max_ticks.is_some_and(|limit| ticks_run >= limit) {
                break 'frames StopReason::TickLimit;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            metrics_window.record_dropped_backlog(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        frames_run = frames_run.saturating_add(1);
        metrics_window.record_frame(raw_frame_dt);
        if let Some(snapshot) = metrics_window.close_if_elapsed(now) {
            metrics_handle.publish(snapshot);
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                dropped_backlog_ms = snapshot.dropped_backlog_ms,
                entity_count = runner.world().entity_count(),
                "loop_metrics"
            );
        }

        if config.pacing == Pacing::RealTime {
            // Single pacing sleep point; holds one frame per fixed step.
            let cap_sleep = compute_cap_sleep(frame_start.elapsed(), Some(fixed_dt));
            if cap_sleep > Duration::ZERO {
                thread::sleep(cap_sleep);
            }
        }
    };

    let summary = LoopSummary {
        ticks_run,
        frames_run,
        stop_reason,
        final_title: runner.debug_title(),
        final_entity_count: runner.world().entity_count(),
        final_camera_position: runner.world().camera().position,
    };
    runner.shutdown();
    info!(
        ticks_run = summary.ticks_run,
        frames_run = summary.frames_run,
        stop_reason = summary.stop_reason.as_str(),
        "shutdown"
    );
    summary
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
