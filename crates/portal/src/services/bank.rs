//! Blood bank administration and directory.

use tracing::instrument;

use lifestream_core::directory::DirectoryQuery;
use lifestream_core::forms::{BankForm, FieldErrors};
use lifestream_core::{Bank, BankKey};

use crate::context::{AppContext, PendingWrite};

/// Adds banks and answers directory searches.
#[derive(Debug, Clone, Copy, Default)]
pub struct BankService;

impl BankService {
    /// Add a bank from the admin form.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] if any field is empty.
    #[instrument(skip(self, ctx, form), fields(name = %form.name))]
    pub fn add(
        &self,
        ctx: &AppContext,
        form: &BankForm,
    ) -> Result<PendingWrite<BankKey>, FieldErrors> {
        let bank = form.validate()?;
        Ok(ctx.add_bank(bank))
    }

    /// Banks matching `query`, sorted by name.
    #[must_use]
    pub fn directory(&self, ctx: &AppContext, query: &DirectoryQuery) -> Vec<Bank> {
        let banks = ctx.banks();
        query.filter(banks.iter()).into_iter().cloned().collect()
    }
}
