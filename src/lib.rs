//! Weekly class timetabling over a constraint model solved with HiGHS.

pub mod builder;
pub mod config;
pub mod data;
pub mod error;
pub mod extractor;
pub mod highs;
pub mod model;
pub mod reducer;
pub mod server;
pub mod solver;
pub mod time;
