//! Error types for the object graph and the DSP compiler.
//!
//! User-facing page operations keep a null/false contract (see
//! [`Page`](crate::Page)); these errors are what the lower layers return and
//! what gets logged when a page operation declines a request.

use thiserror::Error;

/// Errors from reading descriptions.
#[derive(Debug, Error)]
pub enum DicoError {
    /// The text is not valid JSON.
    #[error("failed to parse description: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level JSON value is not an object.
    #[error("description must be a JSON object")]
    NotAnObject,

    /// A value cannot be represented as an element (nested arrays, nulls in arrays).
    #[error("unsupported value under key '{key}'")]
    InvalidValue {
        /// Key holding the offending value.
        key: String,
    },
}

/// Errors from the prototype registry and object creation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrototypeError {
    /// A prototype with this name is already registered. The first one wins.
    #[error("the box {0} already exists")]
    AlreadyRegistered(String),

    /// No prototype is registered under this name.
    #[error("the box {0} doesn't exist")]
    Unknown(String),

    /// The description has no usable `name` entry.
    #[error("the description isn't valid for box creation")]
    InvalidDescription,
}

/// Errors from compiling a DSP context.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DspError {
    /// The signal connections contain a feedback loop through this object.
    #[error("signal feedback loop through '{object}' (id {id})")]
    Cycle {
        /// Prototype name of the implicated object.
        object: String,
        /// Page id of the implicated object.
        id: u64,
    },

    /// Sample rate or block size is zero.
    #[error("invalid DSP settings: sample rate {sample_rate}, block size {block_size}")]
    InvalidSettings {
        /// Requested sample rate.
        sample_rate: u32,
        /// Requested block size.
        block_size: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_names_the_object() {
        let err = DspError::Cycle {
            object: "+~".to_string(),
            id: 4,
        };
        assert_eq!(err.to_string(), "signal feedback loop through '+~' (id 4)");
    }

    #[test]
    fn unknown_prototype_message() {
        let err = PrototypeError::Unknown("zorglub".to_string());
        assert_eq!(err.to_string(), "the box zorglub doesn't exist");
    }
}
