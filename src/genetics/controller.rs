//! Genetic controller - turns packed sensor input into an agent decision

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::genetics::behavior::{BehaviorArray, OutputLayout};
use crate::genetics::bitfield::BitField;
use crate::genetics::GeneticParams;
use crate::spatial::environment::Seen;

/// Bits of the sensor word that do not depend on configuration:
/// energy (2) + facing (2) + seen type (2) + seen distance (2)
pub const FIXED_INPUT_BITS: u32 = 8;

/// Movement chosen by the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TurnLeft,
    TurnRight,
    Step,
}

impl Action {
    /// Codes 2 and 3 both step; the action field has four codes but three behaviors
    pub fn from_code(code: u32) -> Self {
        match code & 0b11 {
            0 => Action::TurnLeft,
            1 => Action::TurnRight,
            _ => Action::Step,
        }
    }
}

/// Everything the controller reads from the agent and its surroundings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sensors {
    pub energy: i32,
    pub facing_code: u32,
    pub seen: Seen,
    /// Distance to the seen object, 1-based
    pub distance: u32,
    pub memory: u32,
    pub comm_in: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub memory: u32,
    pub comm_out: u32,
    pub asexual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticController {
    table: BehaviorArray,
    memory_bits: u32,
    comm_bits: u32,
    energy_threshold: i32,
}

impl GeneticController {
    /// Fresh controller with a random table drawn from the simulation stream
    pub fn new_random<R: Rng + ?Sized>(params: &GeneticParams, rng: &mut R) -> Self {
        let layout = OutputLayout::new(params.memory_bits, params.comm_bits);
        Self {
            table: BehaviorArray::random(params.input_bits(), layout, rng),
            memory_bits: params.memory_bits,
            comm_bits: params.comm_bits,
            energy_threshold: params.energy_threshold,
        }
    }

    /// Wrap an existing table, e.g. one re-injected from a saved population
    pub fn with_table(params: &GeneticParams, table: BehaviorArray) -> Self {
        Self {
            table,
            memory_bits: params.memory_bits,
            comm_bits: params.comm_bits,
            energy_threshold: params.energy_threshold,
        }
    }

    /// Asexual offspring: mutated copy of the parent's table
    pub fn from_parent<R: Rng + ?Sized>(
        parent: &GeneticController,
        mutation_rate: f32,
        rng: &mut R,
    ) -> Self {
        Self {
            table: parent.table.mutated_copy(mutation_rate, rng),
            memory_bits: parent.memory_bits,
            comm_bits: parent.comm_bits,
            energy_threshold: parent.energy_threshold,
        }
    }

    /// Sexual offspring: splice of both tables, then mutated
    pub fn from_parents<R: Rng + ?Sized>(
        parent1: &GeneticController,
        parent2: &GeneticController,
        mutation_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        let spliced = parent1.table.splice(&parent2.table, rng)?;
        Ok(Self {
            table: spliced.mutated_copy(mutation_rate, rng),
            memory_bits: parent1.memory_bits,
            comm_bits: parent1.comm_bits,
            energy_threshold: parent1.energy_threshold,
        })
    }

    pub fn table(&self) -> &BehaviorArray {
        &self.table
    }

    pub fn memory_bits(&self) -> u32 {
        self.memory_bits
    }

    pub fn comm_bits(&self) -> u32 {
        self.comm_bits
    }

    /// 2-bit energy bucket, saturating above the threshold
    pub fn energy_bucket(&self, energy: i32) -> u32 {
        if energy > self.energy_threshold {
            3
        } else if energy <= 0 {
            0
        } else {
            ((energy as f64 / self.energy_threshold as f64 * 4.0) as u32).min(3)
        }
    }

    /// Pack sensors into the table index
    pub fn encode(&self, sensors: &Sensors) -> u32 {
        let mut input = BitField::new();
        input
            .push(self.energy_bucket(sensors.energy), 2)
            .push(sensors.facing_code, 2)
            .push(sensors.seen as u32, 2)
            .push(sensors.distance.saturating_sub(1), 2)
            .push(sensors.memory, self.memory_bits)
            .push(sensors.comm_in, self.comm_bits);
        input.value()
    }

    pub fn decide(&self, sensors: &Sensors) -> Decision {
        let outputs = self.table.output(self.encode(sensors));
        Decision {
            action: Action::from_code(outputs.action_code),
            memory: outputs.memory,
            comm_out: outputs.comm,
            asexual: outputs.asexual,
        }
    }

    pub fn similarity(&self, other: &GeneticController) -> f64 {
        self.table.similarity(&other.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::behavior::Outputs;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params() -> GeneticParams {
        GeneticParams {
            memory_bits: 2,
            comm_bits: 1,
            ..GeneticParams::default()
        }
    }

    fn sensors() -> Sensors {
        Sensors {
            energy: 50,
            facing_code: 1,
            seen: Seen::Food,
            distance: 3,
            memory: 2,
            comm_in: 1,
        }
    }

    #[test]
    fn test_action_codes_collapse_to_three_behaviors() {
        assert_eq!(Action::from_code(0), Action::TurnLeft);
        assert_eq!(Action::from_code(1), Action::TurnRight);
        assert_eq!(Action::from_code(2), Action::Step);
        assert_eq!(Action::from_code(3), Action::Step);
    }

    #[test]
    fn test_table_size_matches_configured_widths() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let controller = GeneticController::new_random(&params(), &mut rng);
        assert_eq!(controller.table().len(), 1 << (FIXED_INPUT_BITS + 2 + 1));
    }

    #[test]
    fn test_energy_bucket_saturates() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let controller = GeneticController::new_random(&params(), &mut rng);
        // threshold 160
        assert_eq!(controller.energy_bucket(-5), 0);
        assert_eq!(controller.energy_bucket(39), 0);
        assert_eq!(controller.energy_bucket(40), 1);
        assert_eq!(controller.energy_bucket(120), 3);
        assert_eq!(controller.energy_bucket(160), 3);
        assert_eq!(controller.energy_bucket(10_000), 3);
    }

    #[test]
    fn test_encode_field_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let controller = GeneticController::new_random(&params(), &mut rng);
        // energy 50 -> bucket 1; facing 1; food 2; distance 3 -> 2; memory 2; comm 1
        let expected = 0b01_01_10_10_10_1;
        assert_eq!(controller.encode(&sensors()), expected);
    }

    #[test]
    fn test_decide_reads_table_entry() {
        let p = params();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut table = BehaviorArray::random(p.input_bits(), OutputLayout::new(2, 1), &mut rng);
        let reader = GeneticController::with_table(&p, table.clone());
        let index = reader.encode(&sensors());
        table.set_raw(
            index,
            Outputs {
                action_code: 3,
                memory: 1,
                comm: 1,
                asexual: true,
            },
        );
        let controller = GeneticController::with_table(&p, table);

        let decision = controller.decide(&sensors());
        assert_eq!(decision.action, Action::Step);
        assert_eq!(decision.memory, 1);
        assert_eq!(decision.comm_out, 1);
        assert!(decision.asexual);
    }

    #[test]
    fn test_offspring_tables_are_owned_copies() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let p = params();
        let a = GeneticController::new_random(&p, &mut rng);
        let b = GeneticController::new_random(&p, &mut rng);

        let clone = GeneticController::from_parent(&a, 0.0, &mut rng);
        assert_eq!(clone.similarity(&a), 1.0);
        assert_eq!(clone.memory_bits(), a.memory_bits());

        let child = GeneticController::from_parents(&a, &b, 0.0, &mut rng).unwrap();
        assert!(child.similarity(&a) < 1.0);
        assert!(child.similarity(&b) < 1.0);
        assert_eq!(child.table().len(), a.table().len());
    }
}
