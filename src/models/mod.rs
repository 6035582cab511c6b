pub mod spot;

pub use spot::{SchemaError, Spot, SpotDraft, SpotPatch};
