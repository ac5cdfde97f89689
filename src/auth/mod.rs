pub mod revocation;

pub use revocation::RevocationList;
