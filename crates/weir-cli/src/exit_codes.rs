//! Process exit codes. The contract is coarse: 0 for success, 1 for any
//! failure (parse, engine, CLI or precondition).

pub const OK: i32 = 0;
pub const FAILURE: i32 = 1;
