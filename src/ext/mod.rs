mod best_effort_path_ext;
mod http_ext;
mod input_ext;

pub use best_effort_path_ext::BestEffortPathExt;
pub use http_ext::{HttpError, SendExt};
pub use input_ext::{InputError, read_file_or_stdin};
