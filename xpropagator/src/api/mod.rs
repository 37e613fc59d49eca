//! Request and response types consumed by the external transport.
//!
//! The core owns no wire format: these are plain data types the RPC
//! layer maps its messages onto. TLE lines travel as opaque strings;
//! identifiers are plain integers, as on the wire.

mod sink;
mod types;

pub use sink::{CollectingSink, EphemSink, SinkSendError};
pub use types::{
    flat_to_points, EphemRequest, EphemResponse, EphemResult, EphemTask, EphemerisPoint,
    FlatPointsError, InfoResponse, PropPoint, PropRequest, PropResponse, PropTask, Satellite,
    TimeGrid, TimeStep,
};
