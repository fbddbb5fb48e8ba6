pub mod annotate;
pub mod call;
pub mod check;
pub mod combine;
pub mod convert;
pub mod merge;

pub use annotate::{run_annotate, AnnotateArgs};
pub use call::{run_call, CallArgs};
pub use check::{run_check, CheckArgs};
pub use combine::{run_combine, CombineArgs};
pub use convert::{run_ivar2vcf, run_table2vcf, Ivar2VcfArgs, Table2VcfArgs};
pub use merge::{run_merge, MergeArgs};
