pub mod agent;
pub mod backup;
pub mod cleanup;
pub mod status;
