pub mod command;
pub mod server;
pub mod status;
