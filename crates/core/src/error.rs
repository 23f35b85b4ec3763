//! Error type for module configuration and evaluation

use thiserror::Error;

/// Errors raised by the granular heat-exchange module.
///
/// Everything except the buffer/type checks is a configuration-time failure:
/// the host is expected to abort setup when it sees one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeatGranError {
    #[error("thermal conductivity must be >= 0 (type {particle_type}: {value})")]
    NegativeConductivity { particle_type: usize, value: f64 },

    #[error("'contact_area constant' value must be > 0, got {0}")]
    NonPositiveConstantArea(f64),

    #[error("can use 'area_correction' only for 'contact_area = overlap'")]
    AreaCorrectionRequiresOverlap,

    #[error("area correction only works with granular pair styles (active style: '{pair_style}')")]
    AreaCorrectionRequiresGranular { pair_style: String },

    #[error("stress-strain exponent must be finite and > 0, got {0}")]
    InvalidStressStrainExponent(f64),

    #[error("unknown keyword '{0}'")]
    UnknownKeyword(String),

    #[error("not enough arguments for keyword '{0}'")]
    MissingKeywordArgument(String),

    #[error("expecting {expected} after '{keyword}', got '{value}'")]
    InvalidKeywordValue {
        keyword: String,
        value: String,
        expected: &'static str,
    },

    #[error("only one pair-local consumer may be registered at a time")]
    ConsumerAlreadyRegistered,

    #[error("pair-local consumer does not match the registered one")]
    ConsumerMismatch,

    #[error("pair-local consumer lock was poisoned")]
    ConsumerPoisoned,

    #[error("per-type property '{0}' is not defined")]
    MissingProperty(String),

    #[error("per-type property '{name}' needs {expected} values, got {actual}")]
    PropertyLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("particle {index} has type {particle_type}, outside 1..={max_type}")]
    ParticleTypeOutOfRange {
        index: usize,
        particle_type: u32,
        max_type: usize,
    },

    #[error("buffer '{buffer}' has length {actual}, expected {expected}")]
    BufferLength {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("neighbor entry {index} of particle {particle} is out of range (nall = {nall})")]
    NeighborOutOfRange {
        particle: usize,
        index: usize,
        nall: usize,
    },

    #[error("module used before init()")]
    NotInitialized,
}
