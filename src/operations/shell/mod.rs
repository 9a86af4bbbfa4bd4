mod shell_builder;

pub use shell_builder::ShellBuilder;
