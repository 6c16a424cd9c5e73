use crate::domain::escrow::EscrowTransaction;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct LedgerRow<'a> {
    id: &'a str,
    amount: String,
    status: &'static str,
    recipient_id: &'a str,
    recipient_name: &'a str,
    hash: &'a str,
    created_at: String,
    updated_at: String,
    description: &'a str,
}

/// Writes escrow records as CSV, one row per record, in ledger order.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transactions<'a, I>(&mut self, transactions: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a EscrowTransaction>,
    {
        let mut rows = 0;
        for tx in transactions {
            self.writer.serialize(LedgerRow {
                id: &tx.id,
                amount: tx.amount.to_string(),
                status: tx.status.as_str(),
                recipient_id: &tx.recipient_id,
                recipient_name: &tx.recipient_name,
                hash: &tx.hash,
                created_at: tx.created_at.to_rfc3339(),
                updated_at: tx.updated_at.to_rfc3339(),
                description: &tx.description,
            })?;
            rows += 1;
        }
        if rows == 0 {
            // `serialize` only emits headers alongside the first row.
            self.writer.write_record([
                "id",
                "amount",
                "status",
                "recipient_id",
                "recipient_name",
                "hash",
                "created_at",
                "updated_at",
                "description",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
