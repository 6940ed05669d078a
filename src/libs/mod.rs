pub mod args;
pub mod error;
pub mod io;
pub mod newick;
pub mod pedigree;

#[cfg(feature = "clap")]
pub mod clap;
