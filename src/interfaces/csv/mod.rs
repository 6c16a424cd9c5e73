pub mod ledger_writer;
pub mod run_writer;
