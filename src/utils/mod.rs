pub mod filename;
pub mod scratch;
pub mod scoped_reader;

pub use filename::{sanitize_filename, content_disposition, disambiguate};
pub use scratch::ScratchDir;
pub use scoped_reader::ScopedReader;
