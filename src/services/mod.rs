pub mod gateway;
pub mod sample;
pub mod session;
pub mod trips;
