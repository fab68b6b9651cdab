//! Cryptographic pieces of the session: the backup password splitter, the
//! in-memory vault that seals temp files, and file fingerprints. Each
//! submodule has a single responsibility so the security model stays easy
//! to audit.

pub mod integrity;
pub mod shares;
pub mod vault;
