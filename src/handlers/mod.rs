pub mod index;
pub mod update;
pub mod webhook;
