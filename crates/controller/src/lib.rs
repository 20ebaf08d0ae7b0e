pub mod account;
pub mod cache;
pub mod cloud;
pub mod config;
pub mod copy;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod lock;
pub mod parameters;
pub mod sas;
pub mod shares;
pub mod vhd;
pub mod volume_id;

pub use driver::Driver;
pub use error::{Error, Result};
