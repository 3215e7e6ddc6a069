#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate smart_default;

#[macro_use]
pub mod error;

pub mod cli;
pub mod config;
pub mod michelson;
pub mod submit;
pub mod tzkt;
pub mod x4c;
