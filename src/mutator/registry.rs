//! Capability registry and ordered dispatch

use tracing::debug;

use crate::agent::{Agent, ParentSet};
use crate::core::error::Result;
use crate::mutator::{Capabilities, Mutator, MutatorContext};
use crate::spatial::location::Location;

/// Position of a mutator in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutatorHandle(pub usize);

#[derive(Default)]
pub struct MutatorRegistry {
    mutators: Vec<Box<dyn Mutator>>,
    spawn: Vec<usize>,
    contact: Vec<usize>,
    step: Vec<usize>,
    periodic: Vec<usize>,
}

impl MutatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mutator: Box<dyn Mutator>) -> MutatorHandle {
        let slot = self.mutators.len();
        let caps = mutator.capabilities();
        if caps.spawn {
            self.spawn.push(slot);
        }
        if caps.contact {
            self.contact.push(slot);
        }
        if caps.step {
            self.step.push(slot);
        }
        if caps.periodic {
            self.periodic.push(slot);
        }
        debug!(mutator = mutator.name(), ?caps, "registered mutator");
        self.mutators.push(mutator);
        MutatorHandle(slot)
    }

    pub fn len(&self) -> usize {
        self.mutators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutators.is_empty()
    }

    pub fn capabilities(&self, handle: MutatorHandle) -> Option<Capabilities> {
        self.mutators.get(handle.0).map(|m| m.capabilities())
    }

    /// First registered mutator of type `T`
    pub fn get<T: Mutator>(&self) -> Option<&T> {
        self.mutators.iter().find_map(|m| m.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Mutator>(&mut self) -> Option<&mut T> {
        self.mutators
            .iter_mut()
            .find_map(|m| m.as_any_mut().downcast_mut::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Mutator> {
        self.mutators.iter().map(|m| m.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Mutator>> {
        self.mutators.iter_mut()
    }

    pub fn dispatch_spawn(
        &mut self,
        ctx: &mut MutatorContext<'_>,
        agent: &mut Agent,
        parents: ParentSet<&Agent>,
    ) -> Result<()> {
        for &slot in &self.spawn {
            self.mutators[slot].on_spawn(ctx, agent, parents)?;
        }
        Ok(())
    }

    pub fn dispatch_contact(
        &mut self,
        ctx: &mut MutatorContext<'_>,
        initiator: &mut Agent,
        other: &mut Agent,
    ) -> Result<()> {
        for &slot in &self.contact {
            self.mutators[slot].on_contact(ctx, initiator, other)?;
        }
        Ok(())
    }

    pub fn dispatch_step(
        &mut self,
        ctx: &mut MutatorContext<'_>,
        agent: &mut Agent,
        from: Location,
        to: Location,
    ) -> Result<()> {
        for &slot in &self.step {
            self.mutators[slot].on_step(ctx, agent, from, to)?;
        }
        Ok(())
    }

    pub fn dispatch_update(&mut self, ctx: &mut MutatorContext<'_>) -> Result<()> {
        for &slot in &self.periodic {
            self.mutators[slot].on_update(ctx)?;
        }
        Ok(())
    }

    /// Every mutator, capability or not
    pub fn dispatch_death(&mut self, agent: &Agent) {
        for mutator in self.mutators.iter_mut() {
            mutator.on_death(agent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentParams;
    use crate::core::types::{AgentId, IdAllocator};
    use crate::genetics::{GeneticController, GeneticParams};
    use crate::spatial::environment::Environment;
    use crate::spatial::location::Direction;
    use crate::spatial::topology::Topology;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::any::Any;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        label: &'static str,
        caps: Capabilities,
        log: Log,
    }

    impl Mutator for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }

        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        fn on_spawn(
            &mut self,
            _ctx: &mut MutatorContext<'_>,
            agent: &mut Agent,
            _parents: ParentSet<&Agent>,
        ) -> Result<()> {
            self.log.lock().unwrap().push(format!("{}:spawn:{}", self.label, agent.id.0));
            Ok(())
        }

        fn on_contact(
            &mut self,
            _ctx: &mut MutatorContext<'_>,
            a: &mut Agent,
            b: &mut Agent,
        ) -> Result<()> {
            self.log.lock().unwrap().push(format!("{}:contact:{}>{}", self.label, a.id.0, b.id.0));
            Ok(())
        }

        fn on_update(&mut self, ctx: &mut MutatorContext<'_>) -> Result<()> {
            self.log.lock().unwrap().push(format!("{}:update:{}", self.label, ctx.tick));
            Ok(())
        }

        fn on_death(&mut self, agent: &Agent) {
            self.log.lock().unwrap().push(format!("{}:death:{}", self.label, agent.id.0));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn agent(id: u64) -> Agent {
        let mut rng = ChaCha8Rng::seed_from_u64(id);
        let params = GeneticParams { memory_bits: 0, comm_bits: 0, ..GeneticParams::default() };
        Agent::new(
            AgentId(id),
            0,
            Location::new(0, 0),
            Direction::NORTH,
            AgentParams::default(),
            GeneticController::new_random(&params, &mut rng),
            0,
        )
    }

    #[test]
    fn test_dispatch_follows_capabilities_and_registration_order() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = MutatorRegistry::new();
        registry.register(Box::new(Recorder {
            label: "a",
            caps: Capabilities::NONE.with_spawn().with_periodic(),
            log: log.clone(),
        }));
        registry.register(Box::new(Recorder {
            label: "b",
            caps: Capabilities::NONE.with_spawn().with_contact(),
            log: log.clone(),
        }));
        registry.register(Box::new(Recorder {
            label: "c",
            caps: Capabilities::NONE,
            log: log.clone(),
        }));

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut env = Environment::new(Topology::new(4, 4, false, false), 2);
        let mut ids = IdAllocator::new();
        let mut ctx = MutatorContext {
            tick: 7,
            rng: &mut rng,
            environment: &mut env,
            ids: &mut ids,
        };

        let mut x = agent(1);
        let mut y = agent(2);
        registry.dispatch_spawn(&mut ctx, &mut x, ParentSet::None).unwrap();
        registry.dispatch_contact(&mut ctx, &mut x, &mut y).unwrap();
        registry.dispatch_contact(&mut ctx, &mut y, &mut x).unwrap();
        registry.dispatch_update(&mut ctx).unwrap();
        registry.dispatch_death(&x);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:spawn:1",
                "b:spawn:1",
                "b:contact:1>2",
                "b:contact:2>1",
                "a:update:7",
                "a:death:1",
                "b:death:1",
                "c:death:1",
            ]
        );
    }

    #[test]
    fn test_typed_lookup() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = MutatorRegistry::new();
        let handle = registry.register(Box::new(Recorder {
            label: "only",
            caps: Capabilities::NONE.with_step(),
            log,
        }));
        assert_eq!(handle, MutatorHandle(0));
        assert_eq!(registry.get::<Recorder>().unwrap().label, "only");
        assert!(registry.capabilities(handle).unwrap().step);
        assert!(registry.capabilities(MutatorHandle(3)).is_none());
    }
}
