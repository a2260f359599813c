pub const SUCCESS: i32 = 0;
/// A backend, ingestion or file operation failed
pub const EXECUTION_ERROR: i32 = 1;
/// Invalid argument values
pub const INPUT_ERROR: i32 = 2;
/// Invalid environment configuration
pub const CONFIG_ERROR: i32 = 3;
