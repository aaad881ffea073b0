//! DSP building blocks.
//!
//! Defines the module trait, port and parameter descriptions, the tick
//! context, and the registry that maps module kind IDs to factories.

pub mod context;
pub mod module_trait;
pub mod parameter;
pub mod port;
pub mod registry;

pub use context::TickContext;
pub use module_trait::{DspModule, ModuleCategory, ModuleInfo};
pub use parameter::{ParameterDefinition, ParameterKind};
pub use port::{InputReading, PortDefinition, PortDirection};
pub use registry::{ModuleFactory, ModuleRegistry};
