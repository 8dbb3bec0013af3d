use clap::Parser;
use mm_cli::{finish, http_client, init_logging, BackfillCli, CliError};
use mm_core::{BackfillReport, CnnFearGreedAdapter, FearGreedBackfill, Warehouse};

fn main() {
    let cli = BackfillCli::parse();
    init_logging();
    finish("fear_greed_backfill", run(&cli));
}

fn run(cli: &BackfillCli) -> Result<BackfillReport, CliError> {
    let backfill = FearGreedBackfill::new(CnnFearGreedAdapter::new(http_client()?));
    let warehouse = Warehouse::open(cli.warehouse.config()).map_err(mm_core::IngestError::from)?;
    Ok(backfill.run(&warehouse, cli.date)?)
}
