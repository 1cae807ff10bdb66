use simplelog::warn;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ParameterError {
    #[error("Non valid max/min range for parameter {0}")]
    InvalidRange(String),
    #[error("Default value {value} of parameter {tag} is out of range")]
    DefaultOutOfRange { tag: String, value: f32 },
    #[error("Step of parameter {0} is larger than its range")]
    StepTooLarge(String),
    #[error("Value {value} is out of range for parameter {tag} [{min}, {max}]")]
    OutOfRange {
        tag: String,
        value: f32,
        min: f32,
        max: f32,
    },
}

/// Parameters are what control the behaviour of a module. For an oscillator, the frequency,
/// the detune or the pulse width are the values a host wants to expose and change while the
/// voice is running.
///
/// # Usage
/// Parameters are created through the [ParameterBuilder], which validates the range.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Maximum value that the parameter can reach.
    max: f32,
    /// Minimum value that the parameter can reach.
    min: f32,
    /// The size of the increment, in other words, how big the step is.
    step: f32,
    /// The starting (or default) value of the parameter.
    default: f32,
    /// The runtime value of the parameter.
    current: f32,
    /// The tag of the parameter. Works as identifier to distinguish it from the other
    /// parameters of a module.
    tag: String,
}

impl Parameter {
    pub fn get_tag(&self) -> &String {
        &self.tag
    }

    pub fn get_value(&self) -> f32 {
        self.current
    }

    pub fn get_default(&self) -> f32 {
        self.default
    }

    pub fn get_range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Sets the value of the parameter. Values out of range are rejected and the current value
    /// is kept.
    pub fn set(&mut self, value: f32) -> Result<(), ParameterError> {
        if value <= self.max && value >= self.min {
            self.current = value;
            Ok(())
        } else {
            #[cfg(feature = "verbose_modules")]
            {
                warn!("<b>Value <yellow>out of range</><b>.</>");
                warn!("  |_ Parameter: <yellow>{}</>", self.tag);
                warn!("  |_ Input value: <red>{}</>", value);
                warn!("  |_ Valid range: <green>[{}, {}]</>", self.min, self.max);
                warn!("  |_ Value kept back.");
            }

            Err(ParameterError::OutOfRange {
                tag: self.tag.clone(),
                value,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Goes back to the default value.
    pub fn reset(&mut self) {
        self.current = self.default;
    }

    /// Increases the value of the parameter upon maximum.
    pub fn inc(&mut self) {
        if self.current + self.step > self.max {
            self.current = self.max;
            warn!("<b>Trying to <yellow>exceed</> <b>the value over the maximum.</>");
        } else {
            self.current += self.step;
        }
    }

    /// Decreases the value of the parameter upon minimum.
    pub fn dec(&mut self) {
        if self.current - self.step < self.min {
            self.current = self.min;
            warn!("<b>Trying to <yellow>exceed</> <b>the value under the minimum.</>");
        } else {
            self.current -= self.step;
        }
    }
}

/// A builder pattern to create parameters in a modular fashion. Check [Parameter] for all the
/// information about the fields and how should it be used.
/// # Example
/// ```rust
/// // Detune of an oscillator, in cents
/// ParameterBuilder::new("detune".to_string())
///     .with_max(4800.0)
///     .with_min(-4800.0)
///     .with_step(1.0)
///     .with_default(0.0)
///     .build()
///     .unwrap();
/// ```
pub struct ParameterBuilder {
    /// Maximum value. Defaults on 1.0
    max: Option<f32>,
    /// Minimum value. Defaults on 0.0
    min: Option<f32>,
    /// Step value. Defaults on 0.1
    step: Option<f32>,
    /// Default value. Defaults on 0.0
    default: Option<f32>,
    /// Tag (name) of the field. Serves as identifier and should not be duplicated.
    tag: String,
}

impl ParameterBuilder {
    /// Creates a new builder with all values set at default.
    ///
    /// **Requires** the tag of the parameter, which serves as **identifier**.
    pub fn new(tag: String) -> Self {
        Self {
            max: None,
            min: None,
            step: None,
            default: None,
            tag,
        }
    }

    /// Sets the maximum value of the [Parameter].
    pub fn with_max(mut self, max: f32) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the minimum value of the [Parameter].
    pub fn with_min(mut self, min: f32) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the step of the [Parameter].
    pub fn with_step(mut self, step: f32) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the default value of the [Parameter].
    pub fn with_default(mut self, default: f32) -> Self {
        self.default = Some(default);
        self
    }

    /// Generates a [Parameter] from the specified values. Performs some integrity checks.
    pub fn build(self) -> Result<Parameter, ParameterError> {
        let max = self.max.unwrap_or(1.0);
        let min = self.min.unwrap_or(0.0);
        let step = self.step.unwrap_or(0.1);
        let default = self.default.unwrap_or(0.0);
        let tag = self.tag;

        if max <= min {
            return Err(ParameterError::InvalidRange(tag));
        }

        // also rejects NaN
        if !(default >= min && default <= max) {
            return Err(ParameterError::DefaultOutOfRange {
                tag,
                value: default,
            });
        }

        if step > (max - min) {
            return Err(ParameterError::StepTooLarge(tag));
        }

        Ok(Parameter {
            max,
            min,
            step,
            default,
            current: default,
            tag,
        })
    }
}
