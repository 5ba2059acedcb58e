//! Response payloads for the HTTP endpoints.

pub mod response;
