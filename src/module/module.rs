use simplelog::error;
use std::collections::HashMap;

use super::*;

/// Modules are the building blocks of the synthesizer. They work on whole blocks of samples
/// and are tuned through their [Parameter]s.
///
/// # How it works
/// The host hands a module one block at a time through [process](fn@Module::process): an
/// output buffer the module writes into and a modulation buffer of the same length. Blocks
/// of a module must be processed in temporal order, since modules such as the
/// [Oscillator](struct@crate::bundled_modules::Oscillator) carry state from one block into
/// the next. The length of a block may change from call to call.
///
/// # The parameters
/// [Parameter]s are the values a host may change between blocks.
pub trait Module {
    /// Processes one block. `buffer` receives the output; `modulation` carries the per-sample
    /// modulation input and has the same length.
    fn process(&mut self, buffer: &mut [f32], modulation: &[f32]);

    /// Fills the whole buffer with the output of the module, without modulation, one block of
    /// `block_size` samples at a time.
    fn fill_buffer(&mut self, buffer: &mut [f32], block_size: usize) {
        let block_size = block_size.max(1);
        let silence = vec![0.0; block_size.min(buffer.len())];

        for block in buffer.chunks_mut(block_size) {
            let len = block.len();
            self.process(block, &silence[..len]);
        }
    }

    /// Applies a set of parameter values. Unknown tags and out of range values are reported and
    /// skipped.
    fn update_parameters(&mut self, values: HashMap<String, f32>) {
        for (tag, value) in values {
            match self.get_parameter_mutable(&tag) {
                Some(param) => {
                    if let Err(e) = param.set(value) {
                        error!("<b>Parameter update <red>rejected</><b>: {}</>", e);
                    }
                }
                None => {
                    error!("<b>Parameter tag <red>not found</><b>.</>");
                    error!("  |_ name: {}", tag);
                }
            }
        }
    }

    /// Retrieves a **mutable** parameter given its tag, if exists.
    fn get_parameter_mutable(&mut self, tag: &str) -> Option<&mut Parameter> {
        self.get_parameters_mutable()
            .into_iter()
            .find(|p| p.get_tag() == tag)
    }

    /// Retrieves a *non mutable* parameter given its tag, if exists.
    fn get_parameter(&self, tag: &str) -> Option<&Parameter> {
        self.get_parameters().into_iter().find(|p| p.get_tag() == tag)
    }

    /// Gets all parameters of the module.
    fn get_parameters(&self) -> Vec<&Parameter>;

    /// Gets all mutable parameters of the module.
    fn get_parameters_mutable(&mut self) -> Vec<&mut Parameter>;

    fn get_parameter_count(&self) -> usize {
        self.get_parameters().len()
    }

    fn get_current_parameter_values(&self) -> HashMap<String, f32> {
        self.get_parameters()
            .into_iter()
            .map(|p| (p.get_tag().clone(), p.get_value()))
            .collect()
    }

    fn get_sample_rate(&self) -> f32;

    // USEFUL FOR DEBUGGING
    fn get_name(&self) -> String;
}
