use crate::patch::Patch;
use ringbuf::HeapProducer;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum WrapperError {
    #[error("Producer full: {free} free slots, a block needs {needed}")]
    ProducerFull { free: usize, needed: usize },
}

/// Feeds the output of a [Patch] into a *ring buffer*, a whole block at a time, so the audio
/// callback on the other end only has to pop samples.
///
/// The [Producer](https://docs.rs/ringbuf/latest/ringbuf/producer/struct.Producer.html) must be
/// able to hold at least one block, otherwise nothing is ever pushed.
pub struct BlockProducer {
    patch: Patch,
    producer: HeapProducer<f32>,
    block: Vec<f32>,
}

impl BlockProducer {
    pub fn new(patch: Patch, producer: HeapProducer<f32>) -> Self {
        let block = vec![0.0; patch.block_size()];

        Self {
            patch,
            producer,
            block,
        }
    }

    /// Renders and pushes one block. The patch is left untouched when the ring buffer can not
    /// take the whole block.
    pub fn push_block(&mut self) -> Result<usize, WrapperError> {
        let free = self.producer.free_len();
        if free < self.block.len() {
            return Err(WrapperError::ProducerFull {
                free,
                needed: self.block.len(),
            });
        }

        self.patch.render(&mut self.block);
        Ok(self.producer.push_slice(&self.block))
    }

    /// Pushes blocks while there is room for them. Returns the amount of samples pushed.
    pub fn fill(&mut self) -> usize {
        let mut pushed = 0;
        while let Ok(count) = self.push_block() {
            pushed += count;
        }
        pushed
    }
}
