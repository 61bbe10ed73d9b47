mod effects;
mod logging;
mod shell;

fn main() -> anyhow::Result<()> {
    logging::initialize(logging::LogDestination::File);
    shell::run()
}
