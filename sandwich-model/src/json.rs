//! JSON serialization abstraction.
//!
//! Provides a unified interface over `simd-json` (default) and `serde_json`
//! so the rest of the crate never names a parser backend directly.

#[cfg(feature = "simd")]
pub use simd_json::json;
#[cfg(feature = "simd")]
pub use simd_json::BorrowedValue;
#[cfg(feature = "simd")]
pub use simd_json::Error;
#[cfg(feature = "simd")]
pub use simd_json::OwnedValue as Value;

#[cfg(all(not(feature = "simd"), feature = "serde"))]
pub use serde_json::json;
#[cfg(all(not(feature = "simd"), feature = "serde"))]
pub use serde_json::Error;
#[cfg(all(not(feature = "simd"), feature = "serde"))]
pub use serde_json::Value;

use serde::de::DeserializeOwned;
use serde::Serialize;

#[cfg(feature = "simd")]
pub fn from_str<T: DeserializeOwned>(json: &str) -> Result<T, Error> {
    // simd-json needs mutable access; the immutable &str call sites in this
    // crate are cold paths (tests, REST bodies), so the copy is acceptable.
    let mut buffer = json.as_bytes().to_vec();
    simd_json::from_slice(&mut buffer)
}

#[cfg(all(not(feature = "simd"), feature = "serde"))]
pub fn from_str<T: DeserializeOwned>(json: &str) -> Result<T, Error> {
    serde_json::from_str(json)
}

#[cfg(feature = "simd")]
pub fn to_string<T: Serialize>(value: &T) -> Result<String, Error> {
    simd_json::to_string(value)
}

#[cfg(all(not(feature = "simd"), feature = "serde"))]
pub fn to_string<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string(value)
}
