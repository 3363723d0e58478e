use shipmate::utils::command::CancelToken;

pub type CmdResult<T> = shipmate::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub cancel: CancelToken,
}

pub mod build;
pub mod changelog;
pub mod coverage;
pub mod doctor;
pub mod info;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (shipmate::Result<serde_json::Value>, i32) {
    crate::tty::status("shipmate is working...");

    match command {
        crate::Commands::Build(args) => dispatch!(args, global, build),
        crate::Commands::Coverage(args) => dispatch!(args, global, coverage),
        crate::Commands::Changelog(args) => dispatch!(args, global, changelog),
        crate::Commands::Info(args) => dispatch!(args, global, info),
        crate::Commands::Doctor(args) => dispatch!(args, global, doctor),
    }
}
