// Data types shared between handlers and services

pub mod credentials;
pub mod errors;
pub mod upload;
