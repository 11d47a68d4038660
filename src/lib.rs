#![doc = include_str!("../README.md")]
#![warn(
    clippy::pedantic,
    // nursery lints:
    clippy::use_self,
    clippy::or_fun_call,
    clippy::redundant_clone,
    clippy::equatable_if_let,
    clippy::needless_collect,
    // restriction lints:
    clippy::redundant_type_annotations,
    clippy::semicolon_inside_block,
    // annoying one:
    missing_docs
)]

pub mod cli;
pub mod codec;
pub mod dump;
pub mod error;
pub mod fs_utils;
pub mod io;
pub mod model;
pub mod render;
pub mod scaling;
pub mod template;
