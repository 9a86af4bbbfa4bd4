mod path_assembler;

pub use path_assembler::{Assembly, PathAssembler};
