//! Behavior lookup table and its genetic operators
//!
//! A [`BehaviorArray`] maps every possible sensor word to one packed output
//! entry. Tables are plain owned vectors: copying, mutating and splicing
//! always produce a fresh table, so parent and offspring never share storage.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::genetics::bitfield::{mask, unpack, BitField};

/// Widths of the fields packed into each table entry, top bits first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    pub action_bits: u32,
    pub memory_bits: u32,
    pub comm_bits: u32,
    pub asexual_bits: u32,
}

impl OutputLayout {
    pub const ACTION_BITS: u32 = 2;

    pub fn new(memory_bits: u32, comm_bits: u32) -> Self {
        Self {
            action_bits: Self::ACTION_BITS,
            memory_bits,
            comm_bits,
            asexual_bits: 1,
        }
    }

    pub fn widths(&self) -> [u32; 4] {
        [self.action_bits, self.memory_bits, self.comm_bits, self.asexual_bits]
    }

    pub fn total_bits(&self) -> u32 {
        self.widths().iter().sum()
    }
}

/// One decoded table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outputs {
    pub action_code: u32,
    pub memory: u32,
    pub comm: u32,
    pub asexual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorArray {
    input_bits: u32,
    layout: OutputLayout,
    entries: Vec<u32>,
}

impl BehaviorArray {
    /// All-zero table with `2^input_bits` entries
    pub fn new(input_bits: u32, layout: OutputLayout) -> Self {
        Self {
            input_bits,
            layout,
            entries: vec![0; 1usize << input_bits],
        }
    }

    pub fn random<R: Rng + ?Sized>(input_bits: u32, layout: OutputLayout, rng: &mut R) -> Self {
        let mut table = Self::new(input_bits, layout);
        let out_mask = mask(layout.total_bits());
        for entry in table.entries.iter_mut() {
            *entry = rng.gen::<u32>() & out_mask;
        }
        table
    }

    /// Rebuild a table from exported entries
    pub fn from_entries(input_bits: u32, layout: OutputLayout, entries: Vec<u32>) -> Result<Self> {
        if entries.len() != 1usize << input_bits {
            return Err(SimError::IllegalState(format!(
                "behavior table needs {} entries, got {}",
                1usize << input_bits,
                entries.len()
            )));
        }
        let out_mask = mask(layout.total_bits());
        if entries.iter().any(|e| e & !out_mask != 0) {
            return Err(SimError::IllegalState(
                "behavior table entry wider than its output layout".into(),
            ));
        }
        Ok(Self {
            input_bits,
            layout,
            entries,
        })
    }

    pub fn input_bits(&self) -> u32 {
        self.input_bits
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Raw entry for a sensor word; the word is masked to the table width
    pub fn raw(&self, input: u32) -> u32 {
        self.entries[(input & mask(self.input_bits)) as usize]
    }

    pub fn set_raw(&mut self, input: u32, outputs: Outputs) {
        let mut packed = BitField::new();
        packed
            .push(outputs.action_code, self.layout.action_bits)
            .push(outputs.memory, self.layout.memory_bits)
            .push(outputs.comm, self.layout.comm_bits)
            .push(outputs.asexual as u32, self.layout.asexual_bits);
        let index = (input & mask(self.input_bits)) as usize;
        self.entries[index] = packed.value();
    }

    pub fn output(&self, input: u32) -> Outputs {
        let fields = unpack(self.raw(input), &self.layout.widths());
        Outputs {
            action_code: fields[0],
            memory: fields[1],
            comm: fields[2],
            asexual: fields[3] != 0,
        }
    }

    fn same_shape(&self, other: &BehaviorArray) -> bool {
        self.input_bits == other.input_bits && self.layout == other.layout
    }

    /// Owned copy where each entry is independently re-rolled with probability `rate`
    pub fn mutated_copy<R: Rng + ?Sized>(&self, rate: f32, rng: &mut R) -> Self {
        let out_mask = mask(self.layout.total_bits());
        let mut child = self.clone();
        for entry in child.entries.iter_mut() {
            if rng.gen::<f32>() < rate {
                *entry = rng.gen::<u32>() & out_mask;
            }
        }
        child
    }

    /// Crossover of two tables into one offspring.
    ///
    /// Each entry is taken from either parent with equal chance. The result is
    /// then repaired so that wherever the parents disagree, both of them
    /// contribute; the child of two distinct parents matches neither exactly
    /// unless they differ in a single bit.
    pub fn splice<R: Rng + ?Sized>(&self, other: &BehaviorArray, rng: &mut R) -> Result<Self> {
        if !self.same_shape(other) {
            return Err(SimError::IllegalState(
                "cannot splice behavior tables of different shapes".into(),
            ));
        }

        let mut child = self.clone();
        let mut differing = Vec::new();
        let mut from_self = 0usize;
        let mut from_other = 0usize;
        for (i, (slot, &theirs)) in child.entries.iter_mut().zip(&other.entries).enumerate() {
            let take_other = rng.gen::<bool>();
            if *slot != theirs {
                differing.push(i);
                if take_other {
                    from_other += 1;
                } else {
                    from_self += 1;
                }
            }
            if take_other {
                *slot = theirs;
            }
        }

        match differing.len() {
            0 => {}
            1 => {
                // Mix the bits of the only disputed entry
                let i = differing[0];
                let (a, b) = (self.entries[i], other.entries[i]);
                let diff = a ^ b;
                if diff.count_ones() >= 2 {
                    let low = 1u32 << diff.trailing_zeros();
                    child.entries[i] = (a & !low) | (b & low);
                }
            }
            n => {
                if from_other == 0 {
                    let i = differing[rng.gen_range(0..n)];
                    child.entries[i] = other.entries[i];
                } else if from_self == 0 {
                    let i = differing[rng.gen_range(0..n)];
                    child.entries[i] = self.entries[i];
                }
            }
        }

        Ok(child)
    }

    /// Fraction of output bits the two tables agree on, in [0, 1].
    ///
    /// Tables of different shapes have nothing in common and score 0.
    pub fn similarity(&self, other: &BehaviorArray) -> f64 {
        if !self.same_shape(other) {
            return 0.0;
        }
        let bits = self.layout.total_bits() as u64;
        let total = bits * self.entries.len() as u64;
        if total == 0 {
            return 1.0;
        }
        let differing: u64 = self
            .entries
            .iter()
            .zip(&other.entries)
            .map(|(a, b)| (a ^ b).count_ones() as u64)
            .sum();
        (total - differing) as f64 / total as f64
    }
}
