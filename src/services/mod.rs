// Business logic services module
// Staging, validation and the remote storage client

pub mod drive;
pub mod file_storage;
pub mod google_auth;
pub mod validation;
