pub mod rcon;
pub mod slp;

pub use rcon::RconTransport;
pub use slp::JavaStatusProbe;
