// Process execution backends
//
// The executor builds literal argument vectors and handles elevation; the
// spawner is the only place a process is actually created.

pub mod executor;
pub mod unix;

pub use executor::{
    app_name, validate_app_bundle, validate_path, CommandExecutor, ProcessSpawner, RawOutput,
    DEFAULT_ELEVATION_PROGRAM,
};
pub use unix::SystemSpawner;
