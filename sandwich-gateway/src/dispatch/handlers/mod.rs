//! One module per event family, grouped the way they're described in the
//! dispatch pipeline's component design rather than one file per event name.

pub mod channel;
pub mod guild;
pub mod member;
pub mod misc;
pub mod role;
pub mod voice;

use crate::error::GatewayError;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

/// Parses a raw dispatch payload into `T`, normalizing the error into
/// [`GatewayError::JsonDecode`] the same way every handler needs to.
pub(crate) fn parse<T: DeserializeOwned>(data: &RawValue) -> Result<T, GatewayError> {
    serde_json::from_str(data.get()).map_err(Into::into)
}
