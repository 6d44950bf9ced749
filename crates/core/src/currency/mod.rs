//! Multi-currency handling and the FX rate table.

pub mod conversion;
pub mod error;
pub mod exchange;
pub mod fx;

#[cfg(test)]
mod props;

pub use conversion::{convert_amount, convert_booked};
pub use error::FxError;
pub use exchange::FxRate;
pub use fx::FxRateTable;
