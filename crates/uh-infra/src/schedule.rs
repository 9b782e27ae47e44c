//! Soft deletion. Orders are never removed outright; their end date is set
//! to the close of the current billing period, expressed as a civil date in
//! the vendor's billing timezone.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use newvm_api::EndDateRequest;

use crate::types::OrderId;
use crate::{Error, Result};

pub const BILLING_TIMEZONE: Tz = chrono_tz::Europe::Amsterdam;

/// Civil date on which the order's current billing period ends.
///
/// `billed_until` is an RFC 3339 timestamp with milliseconds, e.g.
/// `2025-03-31T22:00:00.000Z`.
pub fn termination_date(order_id: OrderId, billed_until: Option<&str>) -> Result<NaiveDate> {
    let value = billed_until
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingField {
            order_id,
            field: "billed_until",
        })?;

    let instant = DateTime::parse_from_rfc3339(value).map_err(|source| Error::InvalidDateFormat {
        order_id,
        field: "billed_until",
        value: value.to_string(),
        source,
    })?;

    Ok(instant.with_timezone(&BILLING_TIMEZONE).date_naive())
}

pub fn end_date_request(order_id: OrderId, billed_until: Option<&str>) -> Result<EndDateRequest> {
    let date = termination_date(order_id, billed_until)?;
    Ok(EndDateRequest {
        end_date: date.format("%Y-%m-%d").to_string(),
        include_sub_orders: true,
    })
}
