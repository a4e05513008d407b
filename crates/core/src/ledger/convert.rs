//! Converting a posting request into the ledger's base currency.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::types::CurrencyCode;

use super::types::{EntryLine, FxAudit, PostingRequest};
use crate::currency::{FxError, FxResolver};

/// Converts every line of `request` into `base` at `as_of`.
///
/// Requests already in `base` are returned unchanged. Otherwise each amount
/// is converted with banker's rounding and lines that round to zero are
/// dropped. Any rounding residual between the sides is absorbed by the
/// largest line on the short side, so a balanced request stays balanced.
/// The posting currency becomes `base` and the conversion is recorded in
/// `fx_audit` and appended to the memo.
///
/// # Errors
///
/// Returns `FxError::MissingRate` if no strict conversion path exists.
pub fn convert_request(
    request: PostingRequest,
    base: &CurrencyCode,
    fx: &FxResolver,
    as_of: DateTime<Utc>,
) -> Result<PostingRequest, FxError> {
    if &request.currency == base {
        return Ok(request);
    }

    let quote = fx.resolve(&request.currency, base, as_of)?;
    let mut lines: Vec<EntryLine> = request
        .lines
        .iter()
        .map(|line| EntryLine {
            account_code: line.account_code.clone(),
            debit: quote.convert(line.debit),
            credit: quote.convert(line.credit),
        })
        .filter(|line| !(line.debit.is_zero() && line.credit.is_zero()))
        .collect();
    absorb_residual(&mut lines);

    let note = format!(
        "[fx {} -> {} @ {} ({:?}, as of {})]",
        request.currency,
        base,
        quote.rate,
        quote.method,
        as_of.to_rfc3339()
    );
    let memo = if request.memo.is_empty() {
        note
    } else {
        format!("{} {note}", request.memo)
    };

    Ok(PostingRequest {
        currency: base.clone(),
        memo,
        lines,
        fx_audit: Some(FxAudit {
            original_currency: request.currency.clone(),
            rate: quote.rate,
            method: quote.method,
            as_of,
        }),
        ..request
    })
}

/// Moves the debit/credit difference onto the largest line of the short side.
///
/// Does nothing when the lines already balance or the short side is empty.
fn absorb_residual(lines: &mut [EntryLine]) {
    let debit: Decimal = lines.iter().map(|l| l.debit).sum();
    let credit: Decimal = lines.iter().map(|l| l.credit).sum();
    let residual = debit - credit;

    if residual > Decimal::ZERO {
        if let Some(line) = lines
            .iter_mut()
            .filter(|l| !l.credit.is_zero())
            .max_by_key(|l| l.credit)
        {
            line.credit += residual;
        }
    } else if residual < Decimal::ZERO {
        if let Some(line) = lines
            .iter_mut()
            .filter(|l| !l.debit.is_zero())
            .max_by_key(|l| l.debit)
        {
            line.debit -= residual;
        }
    }
}
