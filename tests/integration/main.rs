//! Integration tests, exercising the public API end to end rather than
//! a single module's internals.

#[cfg(feature = "npz")]
mod npz;
mod primitive;
mod reader;
mod round_trip;
