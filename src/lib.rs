pub mod belief;
pub mod config;
pub mod error;
pub mod eval;
pub mod filter;
pub mod imaging;
pub mod io;
pub mod measurement;
pub mod system;
