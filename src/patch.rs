use crate::module::Module;
use simplelog::info;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum PatchError {
    #[error("Found a duplicated module id: {0}")]
    DuplicatedId(i64),
    #[error("Module {id} is modulated by module {from}, which does not exist")]
    UnknownSource { id: i64, from: i64 },
    #[error("Module {0} is part of a modulation loop")]
    Cycle(i64),
    #[error("Output module {0} does not exist")]
    UnknownOutput(i64),
    #[error("Block size must be at least one sample")]
    InvalidBlockSize,
    #[error("Module {id} runs at {found} Hz while the patch runs at {expected} Hz")]
    SampleRateMismatch { id: i64, expected: f32, found: f32 },
}

/// A module of a [Patch] along with the module feeding its modulation input, if any.
pub struct PatchCell {
    pub id: i64,
    pub module: Box<dyn Module>,
    pub modulated_by: Option<i64>,
}

impl PatchCell {
    pub fn new(id: i64, module: Box<dyn Module>, modulated_by: Option<i64>) -> Self {
        Self {
            id,
            module,
            modulated_by,
        }
    }
}

struct Slot {
    id: i64,
    module: Box<dyn Module>,
    /// Position of the source slot, always before this one.
    source: Option<usize>,
    buffer: Vec<f32>,
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    New,
    InProgress,
    Done,
}

/// A set of modules rendered together, block by block. The output of a module can be routed
/// into the modulation input of another one, e.g. a slow sine driving the detune of a voice.
///
/// Modules are sorted on construction so every source is processed before the modules it
/// modulates. Each module owns a block-sized buffer, so rendering does not allocate.
pub struct Patch {
    slots: Vec<Slot>,
    output: usize,
    block_size: usize,
    sample_rate: f32,
    silence: Vec<f32>,
}

impl Patch {
    /// Builds a patch whose output is the module `output_id`.
    ///
    /// # Expected errors
    /// * Duplicated ids, unknown sources or an unknown output.
    /// * Modulation loops, including a module modulating itself.
    /// * A module running at a different sample rate.
    /// * A zero block size.
    pub fn new(
        cells: Vec<PatchCell>,
        output_id: i64,
        sample_rate: f32,
        block_size: usize,
    ) -> Result<Self, PatchError> {
        if block_size == 0 {
            return Err(PatchError::InvalidBlockSize);
        }

        let mut indices: HashMap<i64, usize> = HashMap::new();
        for (index, cell) in cells.iter().enumerate() {
            if indices.insert(cell.id, index).is_some() {
                return Err(PatchError::DuplicatedId(cell.id));
            }

            let found = cell.module.get_sample_rate();
            if found != sample_rate {
                return Err(PatchError::SampleRateMismatch {
                    id: cell.id,
                    expected: sample_rate,
                    found,
                });
            }
        }

        let output = *indices
            .get(&output_id)
            .ok_or(PatchError::UnknownOutput(output_id))?;

        let sources = cells
            .iter()
            .map(|cell| match cell.modulated_by {
                Some(from) => indices
                    .get(&from)
                    .copied()
                    .map(Some)
                    .ok_or(PatchError::UnknownSource { id: cell.id, from }),
                None => Ok(None),
            })
            .collect::<Result<Vec<Option<usize>>, PatchError>>()?;

        // EVALUATION ORDER
        // Every module has at most one source, so following the sources from any module
        // gives a chain that must end in an unmodulated (or already sorted) module.
        let mut state = vec![Visit::New; cells.len()];
        let mut order = Vec::with_capacity(cells.len());
        for start in 0..cells.len() {
            let mut chain = Vec::new();
            let mut current = Some(start);

            while let Some(index) = current {
                match state[index] {
                    Visit::Done => break,
                    Visit::InProgress => return Err(PatchError::Cycle(cells[index].id)),
                    Visit::New => {
                        state[index] = Visit::InProgress;
                        chain.push(index);
                        current = sources[index];
                    }
                }
            }

            for index in chain.into_iter().rev() {
                state[index] = Visit::Done;
                order.push(index);
            }
        }

        let mut position = vec![0; cells.len()];
        for (slot, index) in order.iter().enumerate() {
            position[*index] = slot;
        }

        let mut cells: Vec<Option<PatchCell>> = cells.into_iter().map(Some).collect();
        let slots = order
            .iter()
            .filter_map(|index| {
                cells[*index].take().map(|cell| Slot {
                    id: cell.id,
                    module: cell.module,
                    source: sources[*index].map(|source| position[source]),
                    buffer: vec![0.0; block_size],
                })
            })
            .collect();

        Ok(Self {
            slots,
            output: position[output],
            block_size,
            sample_rate,
            silence: vec![0.0; block_size],
        })
    }

    /// Fills `out` with the output module's signal, processing every module of the patch in
    /// blocks of [`block_size`](fn@Patch::block_size) samples.
    pub fn render(&mut self, out: &mut [f32]) {
        for block in out.chunks_mut(self.block_size) {
            let len = block.len();

            for index in 0..self.slots.len() {
                let (done, rest) = self.slots.split_at_mut(index);
                let slot = &mut rest[0];

                let modulation = match slot.source {
                    Some(source) => &done[source].buffer[..len],
                    None => &self.silence[..len],
                };

                slot.module.process(&mut slot.buffer[..len], modulation);
            }

            block.copy_from_slice(&self.slots[self.output].buffer[..len]);
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ids of the modules in the order they get processed.
    pub fn order(&self) -> Vec<i64> {
        self.slots.iter().map(|slot| slot.id).collect()
    }

    pub fn output_id(&self) -> i64 {
        self.slots[self.output].id
    }

    pub fn module(&self, id: i64) -> Option<&dyn Module> {
        self.slots
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| slot.module.as_ref())
    }

    pub fn module_mut(&mut self, id: i64) -> Option<&mut Box<dyn Module>> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id == id)
            .map(|slot| &mut slot.module)
    }

    pub fn display_order(&self) {
        info!("ORDER FOR THE PATCH: ");

        for (count, slot) in self.slots.iter().enumerate() {
            info!("  {}. {} (#{})", count + 1, slot.module.get_name(), slot.id);
        }
    }
}
