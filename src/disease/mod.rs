//! Disease - per-agent infection state machine
//!
//! Every agent the mutator has seen spawn is tracked as Healthy, Sick or
//! Vaccinated until its death notification. Transitions:
//!
//! - spawn: roll `initial_infection`; offspring roll `child_transmit_rate`
//!   instead when a living parent is sick, and stay healthy otherwise
//! - contact (one direction per call): vaccinators vaccinate the healthy,
//!   healers may cure the sick, and a sick initiator may infect the other
//!   agent if the transmission matrix allows it and a vaccine does not block it
//! - update: sick agents recover after `recovery_time * U(1.0, 1.2)` ticks;
//!   a recovery time of 0 never recovers
//! - death: the entry is dropped and the sick count adjusted
//!
//! A running per-type sick count is kept in step with the table.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::agent::{Agent, AgentParam, ParentSet};
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, AgentType, Tick};
use crate::mutator::{Capabilities, Mutator, MutatorContext};

const SUBSYSTEM: &str = "disease";

/// Agent parameter scaled whenever an agent falls sick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiseaseEffect {
    pub param: AgentParam,
    pub factor: f32,
}

/// Per-type disease configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseParams {
    /// Chance a freshly spawned parentless agent starts sick
    pub initial_infection: f32,
    /// Chance an agent of this type catches the disease on contact
    pub contact_transmit_rate: f32,
    /// Chance a child of a sick parent is born sick
    pub child_transmit_rate: f32,
    /// `transmit_to[t]`: can a sick agent of this type infect type `t`
    pub transmit_to: Vec<bool>,
    /// Ticks until recovery; 0 means the infection is permanent
    pub recovery_time: u64,
    pub vaccinator: bool,
    pub vaccine_effectiveness: f32,
    pub healer: bool,
    pub healer_effectiveness: f32,
    pub effect: Option<DiseaseEffect>,
}

impl Default for DiseaseParams {
    fn default() -> Self {
        Self::for_type_count(1)
    }
}

impl DiseaseParams {
    /// Defaults with a transmission matrix row that infects every type
    pub fn for_type_count(types: usize) -> Self {
        Self {
            initial_infection: 0.0,
            contact_transmit_rate: 0.5,
            child_transmit_rate: 0.5,
            transmit_to: vec![true; types],
            recovery_time: 100,
            vaccinator: false,
            vaccine_effectiveness: 0.5,
            healer: false,
            healer_effectiveness: 0.5,
            effect: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DiseaseState {
    Healthy,
    Sick { since: Tick },
    Vaccinated { effectiveness: f32 },
}

impl DiseaseState {
    pub fn is_sick(&self) -> bool {
        matches!(self, DiseaseState::Sick { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    agent_type: AgentType,
    state: DiseaseState,
}

pub struct DiseaseMutator {
    params: Vec<DiseaseParams>,
    sick_count: Vec<usize>,
    // Ordered so the recovery pass draws from the stream in a fixed order
    states: BTreeMap<AgentId, Tracked>,
}

impl DiseaseMutator {
    pub fn new(params: Vec<DiseaseParams>) -> Self {
        let types = params.len();
        Self {
            params,
            sick_count: vec![0; types],
            states: BTreeMap::new(),
        }
    }

    fn params_for(&self, agent_type: AgentType) -> Result<&DiseaseParams> {
        self.params.get(agent_type).ok_or_else(|| {
            SimError::Configuration(format!("no disease parameters for agent type {}", agent_type))
        })
    }

    pub fn state(&self, agent: AgentId) -> Result<DiseaseState> {
        self.states
            .get(&agent)
            .map(|t| t.state)
            .ok_or(SimError::UnregisteredAgent { subsystem: SUBSYSTEM, agent })
    }

    pub fn is_sick(&self, agent: AgentId) -> Result<bool> {
        self.state(agent).map(|s| s.is_sick())
    }

    pub fn is_tracked(&self, agent: AgentId) -> bool {
        self.states.contains_key(&agent)
    }

    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }

    /// Running sick count for one type
    pub fn sick_count(&self, agent_type: AgentType) -> usize {
        self.sick_count.get(agent_type).copied().unwrap_or(0)
    }

    pub fn sick_counts(&self) -> &[usize] {
        &self.sick_count
    }

    pub fn total_sick(&self) -> usize {
        self.sick_count.iter().sum()
    }

    /// Sick count per type computed from scratch off the state table
    pub fn recount(&self) -> Vec<usize> {
        let mut counts = vec![0; self.sick_count.len()];
        for tracked in self.states.values() {
            if tracked.state.is_sick() {
                counts[tracked.agent_type] += 1;
            }
        }
        counts
    }

    /// Replace an agent's state, keeping the sick count in step
    fn set_state(&mut self, agent: AgentId, agent_type: AgentType, state: DiseaseState) {
        let was_sick = self
            .states
            .insert(agent, Tracked { agent_type, state })
            .map(|old| old.state.is_sick())
            .unwrap_or(false);
        match (was_sick, state.is_sick()) {
            (false, true) => self.sick_count[agent_type] += 1,
            (true, false) => self.sick_count[agent_type] -= 1,
            _ => {}
        }
    }

    /// Roll `rate`; on success the agent falls sick now
    fn make_random_sick(
        &mut self,
        ctx: &mut MutatorContext<'_>,
        agent: &mut Agent,
        rate: f32,
    ) -> Result<bool> {
        if ctx.rng.gen::<f32>() >= rate {
            return Ok(false);
        }
        if let Some(effect) = self.params_for(agent.agent_type)?.effect {
            agent.params.multiply(effect.param, effect.factor);
        }
        self.set_state(agent.id, agent.agent_type, DiseaseState::Sick { since: ctx.tick });
        debug!(agent = %agent.id, tick = ctx.tick, "agent fell sick");
        Ok(true)
    }

    fn tracked_sick(&self, agent: AgentId) -> bool {
        self.states.get(&agent).map(|t| t.state.is_sick()).unwrap_or(false)
    }

    fn transmit_one_way(
        &mut self,
        ctx: &mut MutatorContext<'_>,
        bumper: &Agent,
        bumpee: &mut Agent,
    ) -> Result<()> {
        let bumper_params = self.params_for(bumper.agent_type)?;
        let vaccinator = bumper_params.vaccinator;
        let vaccine_effectiveness = bumper_params.vaccine_effectiveness;
        let healer = bumper_params.healer;
        let healer_effectiveness = bumper_params.healer_effectiveness;
        let permitted = bumper_params
            .transmit_to
            .get(bumpee.agent_type)
            .copied()
            .unwrap_or(false);
        let bumpee_state = self.state(bumpee.id)?;
        let bumper_sick = self.is_sick(bumper.id)?;

        if vaccinator && !bumpee_state.is_sick() {
            self.set_state(
                bumpee.id,
                bumpee.agent_type,
                DiseaseState::Vaccinated {
                    effectiveness: vaccine_effectiveness,
                },
            );
            trace!(by = %bumper.id, agent = %bumpee.id, "vaccinated");
            return Ok(());
        }

        if healer && bumpee_state.is_sick() {
            if ctx.rng.gen::<f32>() < healer_effectiveness {
                self.set_state(bumpee.id, bumpee.agent_type, DiseaseState::Healthy);
                debug!(by = %bumper.id, agent = %bumpee.id, "healed");
            }
            return Ok(());
        }

        if !bumper_sick || bumpee_state.is_sick() {
            return Ok(());
        }

        if let DiseaseState::Vaccinated { effectiveness } = bumpee_state {
            if ctx.rng.gen::<f32>() < effectiveness {
                trace!(agent = %bumpee.id, "vaccine blocked transmission");
                return Ok(());
            }
        }

        if permitted {
            let rate = self.params_for(bumpee.agent_type)?.contact_transmit_rate;
            self.make_random_sick(ctx, bumpee, rate)?;
        }
        Ok(())
    }
}

impl Mutator for DiseaseMutator {
    fn name(&self) -> &'static str {
        SUBSYSTEM
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE.with_spawn().with_contact().with_periodic()
    }

    fn on_spawn(
        &mut self,
        ctx: &mut MutatorContext<'_>,
        agent: &mut Agent,
        parents: ParentSet<&Agent>,
    ) -> Result<()> {
        let params = self.params_for(agent.agent_type)?;
        let rate = match parents {
            ParentSet::None => params.initial_infection,
            _ => {
                let parent_sick = parents
                    .iter()
                    .any(|p| p.is_alive() && self.tracked_sick(p.id));
                if parent_sick {
                    params.child_transmit_rate
                } else {
                    0.0
                }
            }
        };
        self.set_state(agent.id, agent.agent_type, DiseaseState::Healthy);
        self.make_random_sick(ctx, agent, rate)?;
        Ok(())
    }

    fn on_contact(
        &mut self,
        ctx: &mut MutatorContext<'_>,
        initiator: &mut Agent,
        other: &mut Agent,
    ) -> Result<()> {
        self.transmit_one_way(ctx, initiator, other)
    }

    fn on_update(&mut self, ctx: &mut MutatorContext<'_>) -> Result<()> {
        let mut recovered = Vec::new();
        for (&id, tracked) in &self.states {
            let since = match tracked.state {
                DiseaseState::Sick { since } => since,
                _ => continue,
            };
            let recovery_time = self.params[tracked.agent_type].recovery_time;
            if recovery_time == 0 {
                continue;
            }
            let threshold = (recovery_time as f64 * (ctx.rng.gen::<f64>() * 0.2 + 1.0)) as u64;
            if ctx.tick.saturating_sub(since) > threshold {
                recovered.push((id, tracked.agent_type));
            }
        }
        for (id, agent_type) in recovered {
            self.set_state(id, agent_type, DiseaseState::Healthy);
            debug!(agent = %id, tick = ctx.tick, "recovered");
        }
        Ok(())
    }

    fn on_death(&mut self, agent: &Agent) {
        if let Some(tracked) = self.states.remove(&agent.id) {
            if tracked.state.is_sick() {
                self.sick_count[tracked.agent_type] -= 1;
            }
        }
    }

    fn export_state(&self, agent: AgentId) -> Result<Option<serde_json::Value>> {
        let state = self.state(agent)?;
        Ok(Some(serde_json::to_value(state)?))
    }

    fn import_state(
        &mut self,
        agent: AgentId,
        agent_type: AgentType,
        state: serde_json::Value,
    ) -> Result<()> {
        self.params_for(agent_type)?;
        let state: DiseaseState = serde_json::from_value(state)?;
        self.set_state(agent, agent_type, state);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
