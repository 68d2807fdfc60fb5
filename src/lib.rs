// Pedantic and nursery lints on, minus the ones that fight audio code.
#![warn(clippy::pedantic, clippy::nursery)]
// Mostly internal API; #[must_use] on every getter is noise
#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]
// in_left/out_left, gain/gains and friends
#![allow(clippy::similar_names)]
// Sample, frame and ordinal conversions are deliberate
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap
)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
// Exact float comparison is intended in range checks and coefficient caching
#![allow(clippy::float_cmp)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::doc_markdown,
    clippy::needless_pass_by_value,
    clippy::trivially_copy_pass_by_ref
)]

pub mod amp;
pub mod audio;
pub mod console;
pub mod preset;
pub mod processor;
pub mod render;
pub mod settings;
