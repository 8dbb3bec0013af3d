use clap::Parser;
use mm_cli::{finish, http_client, init_logging, CliError, IngestCli};
use mm_core::{CnnFearGreedAdapter, CurrentFearGreedIngestor, CurrentRunReport, Warehouse};

fn main() {
    let cli = IngestCli::parse();
    init_logging();
    finish("fear_greed", run(&cli));
}

fn run(cli: &IngestCli) -> Result<CurrentRunReport, CliError> {
    let ingestor = CurrentFearGreedIngestor::new(CnnFearGreedAdapter::new(http_client()?));
    let warehouse = Warehouse::open(cli.warehouse.config()).map_err(mm_core::IngestError::from)?;
    Ok(ingestor.run(&warehouse)?)
}
