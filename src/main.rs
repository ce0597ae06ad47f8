mod args;
mod config;
mod reader;
mod writer;

use cle::input::{AccountRecord, CommandRecord};
use cle::stores::{LedgerStore, MemoryStore};
use cle::{AccountReport, MemoryLedger, Result};

fn main() -> Result {
    let settings = config::configure_app()?;

    log::debug!("Application configured. Beginning process...");

    let paths = args::parse_input_args()?;
    log::debug!("Found filepaths as input args: {paths:?}");

    let (store, engine) = cle::build_memory_ledger(settings);

    open_accounts(&store, reader::read_records(&paths.accounts)?);
    submit_transactions(&store, &engine, reader::read_records(&paths.transactions)?);

    log::debug!("Process complete. Beginning report...");

    report_to_std_out(&store)?;

    log::debug!("Application finished successfully!");

    Ok(())
}

fn open_accounts(store: &MemoryStore, records: Vec<AccountRecord>) {
    for record in records {
        log::debug!("Parsing record into Account: {record:?}");
        let account = match record.parse_account() {
            Ok(account) => account,
            Err(e) => {
                log::warn!("{e}");
                continue;
            }
        };

        if let Err(e) = store.open_account(account) {
            log::warn!("{e}");
        }
    }
}

/// Submits every row in file order. Rejections are logged and processing
/// continues with the next row.
fn submit_transactions(store: &MemoryStore, engine: &MemoryLedger, records: Vec<CommandRecord>) {
    let find_account = |identifier: &str| store.find_account(identifier).ok().flatten();

    for record in records {
        log::debug!("Parsing record into TransactionCommand: {record:?}");
        let command = match record.parse_command(find_account) {
            Ok(command) => command,
            Err(e) => {
                log::warn!("{e}");
                continue;
            }
        };

        // The engine logs its own rejections and failures
        if let Err(e) = engine.submit_transaction(command) {
            log::debug!("Continuing after: {e}");
        }
    }
}

/// Build report from the final balances, and write it to stdout
fn report_to_std_out(store: &MemoryStore) -> Result {
    let report = AccountReport::build_report(&store.accounts());
    log::debug!("Successfully built reports for {} accounts", report.len());

    let output = writer::write_report(&report)?;

    log::debug!("Writing to stdout: {output:?}");
    print!("{}", output);

    Ok(())
}
