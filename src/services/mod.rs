// Service exports
pub mod catalog;
pub mod device;
pub mod network;

pub use catalog::{CatalogError, FacilityCatalog, FileCatalog, HttpCatalog};
pub use device::{DeviceSensor, GpsdSource, PositionOptions, PositionSource, ReportedPosition};
pub use network::{CoordinateSchema, NetworkLocator};
