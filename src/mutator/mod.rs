//! Mutator plugin system
//!
//! A mutator reacts to agent lifecycle events. Each one declares the
//! [`Capabilities`] it implements when registered, and the
//! [`MutatorRegistry`] keeps one ordered handler list per capability.
//! Dispatch walks those lists in registration order.
//!
//! Death is not a capability: every registered mutator hears about every
//! death exactly once, so it can drop whatever it keeps for that agent.

pub mod registry;

pub use registry::{MutatorHandle, MutatorRegistry};

use rand_chacha::ChaCha8Rng;
use std::any::Any;

use crate::agent::{Agent, ParentSet};
use crate::core::error::Result;
use crate::core::types::{AgentId, AgentType, IdAllocator, Tick};
use crate::spatial::environment::Environment;
use crate::spatial::location::Location;

/// Which hooks a mutator wants to receive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// `on_spawn` for every new agent
    pub spawn: bool,
    /// `on_contact` once per ordered pair per contact
    pub contact: bool,
    /// `on_step` after every successful move
    pub step: bool,
    /// `on_update` once per tick
    pub periodic: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        spawn: false,
        contact: false,
        step: false,
        periodic: false,
    };

    pub const fn with_spawn(mut self) -> Self {
        self.spawn = true;
        self
    }

    pub const fn with_contact(mut self) -> Self {
        self.contact = true;
        self
    }

    pub const fn with_step(mut self) -> Self {
        self.step = true;
        self
    }

    pub const fn with_periodic(mut self) -> Self {
        self.periodic = true;
        self
    }
}

/// Shared simulation state lent to a hook for the duration of one call
pub struct MutatorContext<'a> {
    pub tick: Tick,
    pub rng: &'a mut ChaCha8Rng,
    pub environment: &'a mut Environment,
    pub ids: &'a mut IdAllocator,
}

/// Mutators are `Send` so a whole simulation can move onto a worker thread
pub trait Mutator: Any + Send {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    fn on_spawn(
        &mut self,
        _ctx: &mut MutatorContext<'_>,
        _agent: &mut Agent,
        _parents: ParentSet<&Agent>,
    ) -> Result<()> {
        Ok(())
    }

    /// One direction of a contact; the mirror call arrives separately
    fn on_contact(
        &mut self,
        _ctx: &mut MutatorContext<'_>,
        _initiator: &mut Agent,
        _other: &mut Agent,
    ) -> Result<()> {
        Ok(())
    }

    fn on_step(
        &mut self,
        _ctx: &mut MutatorContext<'_>,
        _agent: &mut Agent,
        _from: Location,
        _to: Location,
    ) -> Result<()> {
        Ok(())
    }

    fn on_update(&mut self, _ctx: &mut MutatorContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Release everything held for `agent`. Called exactly once per agent.
    fn on_death(&mut self, agent: &Agent);

    /// Per-agent state for population export, if this mutator keeps any
    fn export_state(&self, _agent: AgentId) -> Result<Option<serde_json::Value>> {
        Ok(None)
    }

    /// Re-inject state produced by [`Mutator::export_state`]
    fn import_state(
        &mut self,
        _agent: AgentId,
        _agent_type: AgentType,
        _state: serde_json::Value,
    ) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
