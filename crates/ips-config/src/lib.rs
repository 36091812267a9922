//! Configuration for the kernel emulation
//!
//! This crate provides:
//!
//! - `KernelConfig` - identity pool and kernel info, loadable from YAML
//! - `ModuleManifest` / `LibraryManifest` - typed `module.json` / `library.json`
//! - library folder scanning (`load_library`, `load_module`)
//! - manifest validation against the host naming rules
//!
//! # Example
//!
//! ```ignore
//! use ips_config::{load_library, validate_library};
//!
//! let library = load_library("/path/to/library")?;
//! for issue in validate_library("/path/to/library")? {
//!     println!("{}", issue);
//! }
//! ```

mod error;
mod kernel_config;
mod library;
mod manifest;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use kernel_config::{IdentityPoolConfig, KernelConfig, KernelInfo};
pub use library::{
    load_library, load_module, read_json, LibraryFolder, ModuleFolder, SKIPPED_FOLDERS,
};
pub use manifest::{Compatibility, LibraryManifest, ModuleManifest};
pub use validation::{
    is_valid_guid, is_valid_module_name, is_valid_prefix, is_valid_url, validate_library,
    validate_module, ValidationIssue,
};
