//! Built-in core modules of the emulated host
//!
//! These are the modules a real host ships without any library installed.
//! Most of them only exist so plugins can look them up and call into them;
//! Archive Control keeps a working in-memory archive.
//!
//! # Key Types
//!
//! - [`ArchiveControl`] - logged and aggregated values per variable
//! - [`ConnectControl`] - remote access stubs
//! - [`TileVisualization`] - notification counter
//! - [`ModbusGateway`] - IO instance carrying the gateway properties
//!
//! # Example
//!
//! ```ignore
//! let kernel = Kernel::default();
//! kernel.reset();
//! ips_components::register_core_modules(&kernel)?;
//! let archive = kernel.create_instance(ARCHIVE_CONTROL_ID)?;
//! ```

mod archive;
mod args;
mod connect;
mod modbus;
mod tile;

use tracing::info;

use ips_config::{LibraryManifest, ModuleManifest};
use ips_core::{KernelResult, ModuleType};
use ips_kernel::Kernel;

// Re-export main types
pub use archive::{
    AggregationSpan, AggregationType, AggregationVariable, ArchiveControl, ArchiveEntry, ArchiveStore,
    ARCHIVE_CONTROL_ID, MAX_LIMIT,
};
pub use connect::{ConnectControl, CONNECT_CONTROL_ID};
pub use modbus::{ModbusGateway, MODBUS_GATEWAY_ID};
pub use tile::{TileVisualization, TILE_VISUALIZATION_ID};

/// Library the built-in modules belong to
pub const CORE_LIBRARY_ID: &str = "{00000000-0000-0000-0000-000000000000}";

fn core_library() -> LibraryManifest {
    LibraryManifest {
        id: CORE_LIBRARY_ID.to_string(),
        author: "Symcon GmbH".to_string(),
        name: "Core".to_string(),
        url: "https://www.symcon.de".to_string(),
        version: "5.2".to_string(),
        build: 0,
        date: 0,
        compatibility: None,
    }
}

fn core_modules() -> [ModuleManifest; 4] {
    [
        ModuleManifest::new(ARCHIVE_CONTROL_ID, "Archive Control", ModuleType::Core, "AC"),
        ModuleManifest::new(CONNECT_CONTROL_ID, "Connect Control", ModuleType::Core, "CC"),
        ModuleManifest::new(TILE_VISUALIZATION_ID, "Tile Visualization", ModuleType::Core, "VISU"),
        ModuleManifest::new(MODBUS_GATEWAY_ID, "Modbus Gateway", ModuleType::Io, "MB"),
    ]
}

/// Register the classes, the core library and its modules
///
/// Libraries do not survive a kernel reset, so call this after every
/// [`Kernel::reset`].
pub fn register_core_modules(kernel: &Kernel) -> KernelResult<()> {
    let loader = kernel.loader();
    loader.register_class(ArchiveControl::class())?;
    loader.register_class(ConnectControl::class())?;
    loader.register_class(TileVisualization::class())?;
    loader.register_class(ModbusGateway::class())?;

    loader.register_library(core_library());
    for manifest in core_modules() {
        loader.register_module(manifest, CORE_LIBRARY_ID)?;
    }
    info!("Registered core modules");
    Ok(())
}
