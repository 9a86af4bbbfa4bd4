pub mod assemble;
pub mod motorcycle;
pub mod query;
pub mod shell;
pub mod slice;
