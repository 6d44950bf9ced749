//! Entry builder: resolves, validates and persists balanced entries.
//!
//! Every check runs before the single store write, so a failed build leaves
//! nothing behind.

use chrono::Utc;
use tally_shared::types::{EntryId, LineId};
use tracing::{debug, info};

use super::error::LedgerError;
use super::types::{BuiltEntry, CreateEntryInput, ResolvedLine};
use super::validation::{resolve_line, validate_balance, validate_header};
use crate::currency::FxRateTable;
use crate::store::{CategoryLink, Entry, LedgerStore, Line, StoreError};

/// Builds entries against a store and its rate table.
pub struct EntryBuilder<'a, S> {
    store: &'a S,
}

impl<'a, S: LedgerStore> EntryBuilder<'a, S> {
    /// Wraps a store.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Builds and persists an entry.
    ///
    /// With an external id already used in the ledger, the stored entry is
    /// returned unchanged and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if any line or the entry as a whole is invalid;
    /// nothing is persisted in that case.
    #[tracing::instrument(skip(self, input), fields(ledger_id = %input.ledger_id, lines = input.lines.len()))]
    pub fn create(&self, input: CreateEntryInput) -> Result<BuiltEntry, LedgerError> {
        if input.lines.len() < 2 {
            return Err(LedgerError::validation(format!(
                "entry needs at least 2 lines, got {}",
                input.lines.len()
            )));
        }
        if let Some(existing) = self.existing(&input)? {
            debug!(entry_id = %existing.entry.id, "external id replayed, returning stored entry");
            return Ok(existing);
        }

        let built = self.build(&input)?;
        let entry_id = built.entry.id;

        match self
            .store
            .create_entry(built.entry, built.lines, built.category)
        {
            Ok(stored) => {
                info!(
                    entry_id = %stored.entry.id,
                    base_currency = %stored.entry.base_currency,
                    total = %stored.total_debit(),
                    "entry created"
                );
                Ok(stored)
            }
            // Lost a race with a concurrent create for the same external id.
            Err(StoreError::Duplicate { .. }) if input.external_id.is_some() => {
                match self.existing(&input)? {
                    Some(existing) => Ok(existing),
                    None => Err(StoreError::duplicate("entry", entry_id).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Runs the full resolution and validation without writing anything.
    ///
    /// # Errors
    ///
    /// Returns the same errors [`Self::create`] would.
    pub fn preview(&self, input: &CreateEntryInput) -> Result<BuiltEntry, LedgerError> {
        self.build(input)
    }

    fn existing(&self, input: &CreateEntryInput) -> Result<Option<BuiltEntry>, LedgerError> {
        let Some(external_id) = &input.external_id else {
            return Ok(None);
        };
        match self
            .store
            .find_entry_by_external_id(input.ledger_id, external_id)
        {
            Some(entry) => Ok(Some(self.store.get_entry_aggregate(entry.id)?)),
            None => Ok(None),
        }
    }

    fn build(&self, input: &CreateEntryInput) -> Result<BuiltEntry, LedgerError> {
        let base = validate_header(input)?;
        let fx = FxRateTable::new(self.store);

        let mut resolved: Vec<ResolvedLine> = Vec::with_capacity(input.lines.len());
        for (idx, spec) in input.lines.iter().enumerate() {
            let account = self
                .store
                .get_account(spec.account_id)
                .map_err(|_| LedgerError::AccountNotFound(spec.account_id))?;
            let line = resolve_line(idx + 1, spec, &account, base, input.booked_at, |b, q, at| {
                fx.get_rate(b, q, at)
            })?;
            resolved.push(line);
        }
        validate_balance(&resolved)?;

        let now = Utc::now();
        let entry = Entry {
            id: EntryId::new(),
            ledger_id: input.ledger_id,
            external_id: input.external_id.clone(),
            booked_at: input.booked_at,
            description: input.description.trim().to_string(),
            status: input.status,
            base_currency: base,
            created_at: now,
        };
        let lines = resolved
            .into_iter()
            .map(|r| Line {
                id: LineId::new(),
                entry_id: entry.id,
                account_id: r.account_id,
                direction: r.direction,
                native: r.native,
                booked: r.booked,
                fx_rate: r.fx_rate,
            })
            .collect();
        let category = input
            .category_id
            .map(|category_id| CategoryLink::manual(entry.id, category_id));

        Ok(BuiltEntry {
            entry,
            lines,
            category,
        })
    }
}
