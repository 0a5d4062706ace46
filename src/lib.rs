#![recursion_limit = "128"]

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod batch;
pub mod errors;
pub mod models;
pub mod parser;
pub mod schema;
pub mod sink;
pub mod store;
