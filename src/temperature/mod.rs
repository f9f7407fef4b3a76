//! Temperature - banded climate that taxes agents away from their comfort zone
//!
//! The grid is split into [`TEMPERATURE_BANDS`] horizontal bands, top to
//! bottom, each with a fixed temperature. Every agent type prefers a
//! temperature and tolerates `preferred_range` around it. Past that, each
//! degree of difference scales one agent parameter by `difference_factor`:
//!
//! `factor = 1 + difference_factor * max(0, |band_temp - preferred| - range)`
//!
//! The factor is applied at spawn and re-applied whenever a step crosses into
//! another band. Only the ratio between old and new factor is applied, so
//! scaling by other mutators (disease effects) is kept.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use tracing::trace;

use crate::agent::{Agent, AgentParam, ParentSet};
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, AgentType};
use crate::mutator::{Capabilities, Mutator, MutatorContext};
use crate::spatial::location::Location;

const SUBSYSTEM: &str = "temperature";

pub const TEMPERATURE_BANDS: usize = 5;

/// Per-type temperature preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureParams {
    pub preferred_temp: f32,
    /// Tolerated distance from `preferred_temp` before any effect
    pub preferred_range: f32,
    /// Parameter scale per degree outside the tolerated range
    pub difference_factor: f32,
    pub param: AgentParam,
}

impl Default for TemperatureParams {
    fn default() -> Self {
        Self {
            preferred_temp: 0.0,
            preferred_range: 0.0,
            difference_factor: 0.0,
            param: AgentParam::StepEnergy,
        }
    }
}

impl TemperatureParams {
    /// Multiplier on `param` for an agent standing at temperature `temp`
    pub fn factor(&self, temp: f32) -> f32 {
        let excess = ((temp - self.preferred_temp).abs() - self.preferred_range).max(0.0);
        1.0 + self.difference_factor * excess
    }
}

/// What the mutator last applied to one agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureState {
    pub band: usize,
    pub factor: f32,
}

pub struct TemperatureMutator {
    bands: Vec<f32>,
    params: Vec<TemperatureParams>,
    height: i32,
    states: AHashMap<AgentId, TemperatureState>,
}

impl TemperatureMutator {
    pub fn new(bands: Vec<f32>, params: Vec<TemperatureParams>, height: i32) -> Self {
        Self {
            bands,
            params,
            height: height.max(1),
            states: AHashMap::new(),
        }
    }

    fn params_for(&self, agent_type: AgentType) -> Result<&TemperatureParams> {
        self.params.get(agent_type).ok_or_else(|| {
            SimError::Configuration(format!(
                "no temperature parameters for agent type {}",
                agent_type
            ))
        })
    }

    /// Band index of a row; rows are split evenly from the top
    pub fn band_of(&self, loc: Location) -> usize {
        let row = loc.y.clamp(0, self.height - 1) as usize;
        let band = row * self.bands.len() / self.height as usize;
        band.min(self.bands.len().saturating_sub(1))
    }

    pub fn temperature_at(&self, loc: Location) -> f32 {
        self.bands.get(self.band_of(loc)).copied().unwrap_or(0.0)
    }

    pub fn state(&self, agent: AgentId) -> Result<TemperatureState> {
        self.states
            .get(&agent)
            .copied()
            .ok_or(SimError::UnregisteredAgent { subsystem: SUBSYSTEM, agent })
    }

    pub fn is_tracked(&self, agent: AgentId) -> bool {
        self.states.contains_key(&agent)
    }

    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }
}

impl Mutator for TemperatureMutator {
    fn name(&self) -> &'static str {
        SUBSYSTEM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_spawn().with_step()
    }

    fn on_spawn(
        &mut self,
        _ctx: &mut MutatorContext<'_>,
        agent: &mut Agent,
        _parents: ParentSet<&Agent>,
    ) -> Result<()> {
        let params = self.params_for(agent.agent_type)?;
        let band = self.band_of(agent.position);
        let factor = params.factor(self.temperature_at(agent.position));
        if factor != 1.0 {
            agent.params.multiply(params.param, factor);
        }
        self.states.insert(agent.id, TemperatureState { band, factor });
        Ok(())
    }

    fn on_step(
        &mut self,
        _ctx: &mut MutatorContext<'_>,
        agent: &mut Agent,
        _from: Location,
        to: Location,
    ) -> Result<()> {
        let previous = self.state(agent.id)?;
        let band = self.band_of(to);
        if band == previous.band {
            return Ok(());
        }
        let params = self.params_for(agent.agent_type)?;
        let factor = params.factor(self.temperature_at(to));
        if factor != previous.factor {
            agent.params.multiply(params.param, factor / previous.factor);
            trace!(agent = %agent.id, band, factor, "temperature changed");
        }
        self.states.insert(agent.id, TemperatureState { band, factor });
        Ok(())
    }

    fn on_death(&mut self, agent: &Agent) {
        self.states.remove(&agent.id);
    }

    fn export_state(&self, agent: AgentId) -> Result<Option<serde_json::Value>> {
        Ok(Some(serde_json::to_value(self.state(agent)?)?))
    }

    fn import_state(
        &mut self,
        agent: AgentId,
        agent_type: AgentType,
        state: serde_json::Value,
    ) -> Result<()> {
        self.params_for(agent_type)?;
        let state: TemperatureState = serde_json::from_value(state)?;
        self.states.insert(agent, state);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
