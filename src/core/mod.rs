pub mod error;
pub mod params;
pub mod types;

pub use error::{ErrorKind, FabricError, Result};
pub use params::RequestParams;
pub use types::{
    EditOutcome, FabricOperation, GlobalId, ObjectIdReservation, ParcelFeatureRef, Record,
    SessionId,
};
