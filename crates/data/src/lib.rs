//! Static template data: creatures, vehicles, seats, accessories.
//!
//! # Invariants
//! - Stores are read-only once built; lookups never allocate.
//! - Accessory lists keep file order, so installation order is stable.

mod demo;
mod store;
mod template;

pub use demo::demo_templates;
pub use store::{StaticTemplates, TemplateError, TemplateFile, TemplateStore};
pub use template::{
    AccessoryTemplate, CreatureTemplate, SeatFlags, SeatTemplate, VehicleFlags, VehicleTemplate,
};
