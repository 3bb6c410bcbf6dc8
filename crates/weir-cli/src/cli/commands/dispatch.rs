use super::super::args::{Cli, Command};
use weir_engine::KernelEngine;

/// Open the engine once and route to the sub-command. The engine handle is
/// scoped to this call, so it is released on every exit path, including
/// errors bubbling out of a command.
pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let engine = KernelEngine::open()?;
    match cli.cmd {
        Command::List(args) => super::list::run(&engine, args),
        Command::Delete(args) => super::delete::run(&engine, args),
        Command::Create(args) => super::create::run(&engine, args),
        Command::Load(args) => super::load::run(&engine, args),
        Command::Monitor(args) => super::monitor::run(&engine, args).await,
    }
}
