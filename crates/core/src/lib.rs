//! Lower-third template resolution engine.
//!
//! Turns an SVG template plus a descriptor and user parameters into final,
//! safe overlay markup, and orchestrates the template/config lifecycle over a
//! pluggable [`store::LowerThirdStore`].

pub mod bindings;
pub mod descriptor;
pub mod dto;
pub mod error;
pub mod params;
pub mod preset;
pub mod resolve;
pub mod service;
pub mod store;
pub mod svg;
pub mod types;

pub use descriptor::{normalize_descriptor, Descriptor};
pub use error::CoreError;
pub use params::{normalize_params, resolve_params, ParamValues};
pub use resolve::{resolve_svg_markup, validate_template_draft, TemplateDraft};
pub use service::{Caller, LowerThirdService};
