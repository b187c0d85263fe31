use anyhow::{bail, Result};
use options::{Command, LogFormat};
use structopt::StructOpt;
use tierlink::harness::ModuleRunner;
use tierlink::module::business::Business;
use tierlink::module::call::Call;
use tierlink::module::data::Data;
use tierlink::module::presentation::Presentation;
use tracing::info;

mod options;

#[tokio::main]
async fn main() -> Result<()> {
    let (command, runner) = init();

    let termination_reason = match command {
        Command::Presentation(options) => runner.run(Presentation::new(options)).await,
        Command::Business(options) => runner.run(Business::new(options)).await,
        Command::Data(options) => runner.run(Data::new(options)).await,
        Command::Call(options) => runner.run(Call::new(options)).await,
    };

    if termination_reason.is_failure() {
        bail!(termination_reason);
    }

    Ok(())
}

fn init() -> (Command, ModuleRunner) {
    let options = options::MainOptions::from_args();

    let formatter = tracing_subscriber::fmt()
        .with_env_filter(options.log)
        .with_writer(std::io::stderr);

    match options.log_format {
        LogFormat::Text => formatter.init(),
        LogFormat::Compact => formatter.compact().init(),
        LogFormat::Json => formatter.json().init(),
    };

    info!("tierlink {}", env!("CARGO_PKG_VERSION"));

    (options.command, ModuleRunner::default())
}
