use clap::Parser;
use mm_cli::{finish, http_client, init_logging, CliError, IngestCli};
use mm_core::{PriceIngestor, PriceRunReport, Warehouse, YahooAdapter};

fn main() {
    let cli = IngestCli::parse();
    init_logging();
    finish("spy", run(&cli));
}

fn run(cli: &IngestCli) -> Result<PriceRunReport, CliError> {
    let ingestor = PriceIngestor::spy(YahooAdapter::new(http_client()?));
    let warehouse = Warehouse::open(cli.warehouse.config()).map_err(mm_core::IngestError::from)?;
    Ok(ingestor.run(&warehouse)?)
}
