use std::f32::consts::TAU;

use engine::{EntityId, Host, HostResult, SpriteDesc, Tag, Vec2};

use super::config::AgentConfig;

const APPROACH_ARRIVAL_DISTANCE: f32 = 10.0;
const RETURN_ARRIVAL_DISTANCE: f32 = 5.0;
const RETURN_SPEED_MULTIPLIER: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum AgentPhase {
    Circling { elapsed: f32 },
    Approaching,
    Interacting { elapsed: f32 },
    Returning,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AgentState {
    pub(crate) angle: f32,
    pub(crate) phase: AgentPhase,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            angle: 0.0,
            phase: AgentPhase::Circling { elapsed: 0.0 },
        }
    }
}

pub(crate) fn orbit_point(anchor: Vec2, radius: f32, angle: f32) -> Vec2 {
    Vec2::new(anchor.x + radius * angle.cos(), anchor.y + radius * angle.sin())
}

fn advance_angle(angle: f32, config: &AgentConfig, dt_seconds: f32) -> f32 {
    (angle + config.orbit_speed * dt_seconds).rem_euclid(TAU)
}

fn step_toward(current: Vec2, target: Vec2, speed: f32, dt_seconds: f32) -> Vec2 {
    let distance = current.distance(target);
    let max_step = speed * dt_seconds;
    if max_step >= distance {
        return target;
    }
    current + (target - current) * (max_step / distance)
}

/// Advances one agent by `dt_seconds` around `anchor` and returns its new
/// position.
pub(crate) fn step_agent(
    state: &mut AgentState,
    position: Vec2,
    anchor: Vec2,
    config: &AgentConfig,
    dt_seconds: f32,
) -> Vec2 {
    match state.phase {
        AgentPhase::Circling { elapsed } => {
            state.angle = advance_angle(state.angle, config, dt_seconds);
            let elapsed = elapsed + dt_seconds;
            state.phase = if elapsed >= config.circle_duration {
                AgentPhase::Approaching
            } else {
                AgentPhase::Circling { elapsed }
            };
            orbit_point(anchor, config.orbit_radius, state.angle)
        }
        AgentPhase::Approaching => {
            if position.distance(anchor) < APPROACH_ARRIVAL_DISTANCE {
                state.phase = AgentPhase::Interacting { elapsed: 0.0 };
                return position;
            }
            step_toward(position, anchor, config.move_speed, dt_seconds)
        }
        AgentPhase::Interacting { elapsed } => {
            let elapsed = elapsed + dt_seconds;
            state.phase = if elapsed >= config.interact_duration {
                AgentPhase::Returning
            } else {
                AgentPhase::Interacting { elapsed }
            };
            anchor
        }
        AgentPhase::Returning => {
            let target = orbit_point(anchor, config.orbit_radius, state.angle);
            if position.distance(target) < RETURN_ARRIVAL_DISTANCE {
                state.phase = AgentPhase::Circling { elapsed: 0.0 };
                return target;
            }
            // The orbit point keeps moving so the agent rejoins on an arc.
            state.angle = advance_angle(state.angle, config, dt_seconds);
            step_toward(
                position,
                target,
                config.move_speed * RETURN_SPEED_MULTIPLIER,
                dt_seconds,
            )
        }
    }
}

pub(crate) fn spawn_agent<H: Host + ?Sized>(
    host: &mut H,
    anchor: Vec2,
    config: &AgentConfig,
) -> HostResult<(EntityId, AgentState)> {
    let state = AgentState::default();
    let id = host.spawn_visual_entity(
        SpriteDesc::square(config.size, config.color),
        orbit_point(anchor, config.orbit_radius, state.angle),
        config.z_order,
    );
    host.tag_entity(id, Tag::Agent)?;
    Ok((id, state))
}

pub(crate) fn update_agent<H: Host + ?Sized>(
    host: &mut H,
    agent: EntityId,
    anchor_entity: EntityId,
    state: &mut AgentState,
    config: &AgentConfig,
) -> HostResult<Vec2> {
    let anchor = host.get_position(anchor_entity)?;
    let position = host.get_position(agent)?;
    let next = step_agent(state, position, anchor, config, host.delta_time().max(0.0));
    host.set_position(agent, next)?;
    Ok(next)
}
