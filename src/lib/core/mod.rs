pub mod concurrency;
pub mod error;
pub mod errors;
pub mod fs;
pub mod io;

pub mod prelude {
    pub use super::concurrency::{determine_allowed_cpus, set_rayon_global_pools_size};
    pub use super::error::{PilevarError, Result};
    pub use super::errors::is_broken_pipe;
    pub use super::fs::{is_gzipped, make_parent_dirs};
    pub use super::io::{get_line_reader, get_tsv_reader, get_writer};
}
