//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod lower_third_config_repo;
pub mod lower_third_template_repo;

pub use lower_third_config_repo::LowerThirdConfigRepo;
pub use lower_third_template_repo::LowerThirdTemplateRepo;
