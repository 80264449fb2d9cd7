pub mod cli;
pub mod conduit;
pub mod config;
pub mod convert;
pub mod coverage;
pub mod detect;
pub mod diff_id;
pub mod error;
pub mod model;
pub mod parsers;
pub mod report;
pub mod trigger;
pub mod vcs;
