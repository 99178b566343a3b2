//! Constrained execution of external commands.
//!
//! Every command runs with an isolated environment, a hard timeout and
//! optional live output. Two call modes are offered: [`Shellout::shellout`]
//! reports any exit status as a result, [`Shellout::shellout_checked`] turns a
//! failed exit status into an error carrying the full [`ExecResult`].

pub mod env;
pub mod exec;
pub mod types;

pub use env::IsolatedEnv;
pub use exec::{ExecConfig, Shellout};
pub use types::{ExecResult, Invocation, ShelloutError};
