//! Background driver for a simulation
//!
//! The runner moves a [`Simulation`] onto a worker thread and drives it with
//! start/pause/step/stop commands over a channel. Commands are only looked at
//! between ticks, so a tick is never interrupted and never overlaps another.
//! After every tick the worker publishes a [`SimulationStats`] snapshot.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info};

use crate::core::error::{Result, SimError};
use crate::simulation::{Simulation, SimulationStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerCommand {
    /// Tick continuously, one tick per interval
    Start,
    /// Stop ticking, keep the simulation
    Pause,
    /// Run exactly one tick, then stay paused
    Step,
    /// Shut the worker down and hand the simulation back
    Stop,
}

pub struct SimulationRunner {
    commands: Sender<RunnerCommand>,
    stats: Receiver<SimulationStats>,
    worker: Option<JoinHandle<Result<Simulation>>>,
}

impl SimulationRunner {
    /// Spawn the worker; it starts paused
    pub fn spawn(simulation: Simulation, tick_interval: Duration) -> Self {
        let (commands, inbox) = mpsc::channel();
        let (publish, stats) = mpsc::channel();
        let worker = thread::spawn(move || drive(simulation, inbox, publish, tick_interval));
        Self {
            commands,
            stats,
            worker: Some(worker),
        }
    }

    pub fn send(&self, command: RunnerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SimError::IllegalState("simulation worker has exited".into()))
    }

    pub fn start(&self) -> Result<()> {
        self.send(RunnerCommand::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(RunnerCommand::Pause)
    }

    pub fn step(&self) -> Result<()> {
        self.send(RunnerCommand::Step)
    }

    /// Newest stats published so far, if any arrived since the last call
    pub fn latest_stats(&self) -> Option<SimulationStats> {
        self.stats.try_iter().last()
    }

    /// Block until the next tick's stats arrive
    pub fn next_stats(&self, timeout: Duration) -> Option<SimulationStats> {
        self.stats.recv_timeout(timeout).ok()
    }

    /// Stop the worker and take the simulation back.
    ///
    /// A tick error that ended the worker early is returned here.
    pub fn stop(mut self) -> Result<Simulation> {
        // The worker may already be gone after a failed tick
        let _ = self.commands.send(RunnerCommand::Stop);
        let worker = self
            .worker
            .take()
            .ok_or_else(|| SimError::IllegalState("runner already stopped".into()))?;
        worker
            .join()
            .map_err(|_| SimError::IllegalState("simulation worker panicked".into()))?
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.commands.send(RunnerCommand::Stop);
            let _ = worker.join();
        }
    }
}

fn drive(
    mut simulation: Simulation,
    inbox: Receiver<RunnerCommand>,
    publish: Sender<SimulationStats>,
    tick_interval: Duration,
) -> Result<Simulation> {
    let mut running = false;
    loop {
        let command = if running {
            match inbox.recv_timeout(tick_interval) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match inbox.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        let tick_now = match command {
            Some(RunnerCommand::Start) => {
                info!(tick = simulation.current_tick(), "simulation started");
                running = true;
                false
            }
            Some(RunnerCommand::Pause) => {
                info!(tick = simulation.current_tick(), "simulation paused");
                running = false;
                false
            }
            Some(RunnerCommand::Step) => {
                running = false;
                true
            }
            Some(RunnerCommand::Stop) => break,
            None => true,
        };

        if tick_now {
            if let Err(e) = simulation.tick() {
                error!(
                    tick = simulation.current_tick(),
                    error = %e,
                    "tick failed, worker stopping"
                );
                return Err(e);
            }
            // Nobody listening is fine
            let _ = publish.send(simulation.stats());
        }
    }
    info!(tick = simulation.current_tick(), "simulation worker stopped");
    Ok(simulation)
}
