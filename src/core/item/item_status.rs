//! The sale status of an item and the rules for changing it.

use crate::infra::{
    config::MarketplaceConfig,
    error::{ApiResult, ClientError},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// Where an item is in its sale.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "item_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Listed and open to requests.
    OnSale,
    /// Promised to a buyer.
    Reserved,
    /// Handed over.
    Sold,
}

impl ItemStatus {
    /// The token used on the wire and in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::OnSale => "on_sale",
            ItemStatus::Reserved => "reserved",
            ItemStatus::Sold => "sold",
        }
    }

    /// Whether the allowed-transitions table permits `self -> next`.
    ///
    /// Writing the current status again is always allowed.
    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        use ItemStatus::*;
        matches!(
            (self, next),
            (OnSale, OnSale)
                | (OnSale, Reserved)
                | (OnSale, Sold)
                | (Reserved, Reserved)
                | (Reserved, OnSale)
                | (Reserved, Sold)
                | (Sold, Sold)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_sale" => Ok(ItemStatus::OnSale),
            "reserved" => Ok(ItemStatus::Reserved),
            "sold" => Ok(ItemStatus::Sold),
            other => Err(ClientError::BadRequest(format!(
                "invalid item status: {other}"
            ))),
        }
    }
}

/// How strictly item status changes are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status may follow any other.
    #[default]
    Permissive,
    /// Only moves allowed by [`ItemStatus::can_transition_to`].
    Strict,
}

impl TransitionPolicy {
    /// Fails with a bad request if the policy forbids `from -> to`.
    pub fn check(self, from: ItemStatus, to: ItemStatus) -> ApiResult<()> {
        match self {
            TransitionPolicy::Strict if !from.can_transition_to(to) => {
                Err(ClientError::BadRequest(format!("cannot move item from {from} to {to}")).into())
            }
            _ => Ok(()),
        }
    }
}

impl From<MarketplaceConfig> for TransitionPolicy {
    fn from(config: MarketplaceConfig) -> Self {
        if config.strict_status_transitions {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        }
    }
}
