//! Parameter store and configuration surface for the remaster chain.
//!
//! This crate owns the values every mastering stage is configured from:
//!
//! - **Parameters**: [`MasteringParams`] and its per-stage structs, with the
//!   defaults the chain starts from
//! - **Validation**: documented ranges, enforced by rejection
//! - **Presets**: TOML load/save of a complete parameter set
//! - **Advisory**: the textual snapshot handed to an external advice service
//!
//! # Example
//!
//! ```rust
//! use remaster_config::{BandId, MasteringParams};
//!
//! let mut params = MasteringParams::default();
//! params.set_eq_gain(BandId::HighShelf, 2.5);
//! params.reverb.mix = 0.1;
//! params.validate().unwrap();
//!
//! let toml = params.to_toml().unwrap();
//! assert_eq!(MasteringParams::from_toml(&toml).unwrap(), params);
//! ```

mod advisory;
mod error;
mod params;
mod preset;

/// Parameter ranges and validation.
pub mod validation;

pub use advisory::{ADVISORY_SYSTEM_PROMPT, AdvisoryError, AdvisoryRequest, AdvisoryService, Snapshot};
pub use error::ConfigError;
pub use params::{
    BandId, BandParams, CompressorParams, EqBand, FilterType, LimiterParams, MasteringParams,
    MultibandParams, PEAKING_Q, ReverbParams, SaturatorParams, StereoExpanderParams,
};
pub use preset::{Preset, load_params, save_params};
pub use validation::{ValidationError, ValidationResult};
