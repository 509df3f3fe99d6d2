// Dashboard queue catalog - one row per admin moderation queue

use crate::domain::{EventBinding, IdentityRule, InsertPosition, QueueConfig};
use crate::error::{AppError, Result};

pub const BUMP_REQUESTS: &str = "bumpRequests";
pub const VOTE_BOOSTS: &str = "voteBoosts";
pub const TOKEN_PURCHASES: &str = "tokenPurchases";
pub const PENDING_SERVICES: &str = "pendingServices";
pub const PENDING_LISTINGS: &str = "pendingListings";
pub const HYPERSPACE_ORDERS: &str = "hyperspaceOrders";
pub const GIFT_CARD_REDEMPTIONS: &str = "giftCardRedemptions";

fn mongo_id() -> IdentityRule {
    IdentityRule::new("_id").with_alias("id")
}

/// Every admin queue shown on the dashboard, in activation order
pub fn dashboard_queues() -> Vec<QueueConfig> {
    vec![
        QueueConfig::new(BUMP_REQUESTS, mongo_id())
            .bind(EventBinding::insert("newBumpRequest", "bumpRequest"))
            .bind(EventBinding::upsert("bumpRequestUpdated", "bumpRequest"))
            .bind(EventBinding::remove("bumpRequestApproved", "requestId"))
            .bind(EventBinding::remove("bumpRequestRejected", "requestId")),
        QueueConfig::new(VOTE_BOOSTS, mongo_id())
            .bind(EventBinding::insert("newVoteBoost", "boost"))
            .bind(EventBinding::remove("voteBoostApproved", "boostId"))
            .bind(EventBinding::remove("voteBoostRejected", "boostId")),
        QueueConfig::new(TOKEN_PURCHASES, mongo_id())
            .bind(EventBinding::insert("newTokenPurchase", "purchase"))
            .bind(EventBinding::upsert("tokenPurchaseUpdated", "purchase"))
            .bind(EventBinding::remove("tokenPurchaseApproved", "purchaseId"))
            .bind(EventBinding::remove("tokenPurchaseRejected", "purchaseId")),
        QueueConfig::new(PENDING_SERVICES, mongo_id())
            .bind(EventBinding::insert("newPendingService", "service"))
            .bind(EventBinding::remove("serviceApproved", "serviceId"))
            .bind(EventBinding::remove("serviceRejected", "serviceId")),
        QueueConfig::new(PENDING_LISTINGS, mongo_id())
            .bind(EventBinding::insert("newPendingAd", "ad"))
            .bind(EventBinding::upsert("adUpdated", "ad"))
            .bind(EventBinding::remove("adApproved", "adId"))
            .bind(EventBinding::remove("adRejected", "adId")),
        // Orders are worked oldest-first
        QueueConfig::new(
            HYPERSPACE_ORDERS,
            IdentityRule::new("orderId").with_alias("_id").with_alias("id"),
        )
        .insert_at(InsertPosition::Append)
        .bind(EventBinding::insert("newHyperSpaceOrder", "order"))
        .bind(EventBinding::upsert("hyperSpaceOrderUpdated", "order"))
        .bind(EventBinding::remove("hyperSpaceOrderCompleted", "orderId")),
        QueueConfig::new(
            GIFT_CARD_REDEMPTIONS,
            IdentityRule::new("userId").with_alias("_id"),
        )
        .nested_into("redemptions")
        .bind(EventBinding::nested_append(
            "giftCardRedeemed",
            "userId",
            "redemption",
        ))
        .bind(EventBinding::remove("giftCardRedemptionsCleared", "userId")),
    ]
}

/// Catalog rows for the given queue names (all of them when `names` is empty)
///
/// # Errors
/// - AppError::NotFound when a name is not in the catalog
pub fn select(names: &[String]) -> Result<Vec<QueueConfig>> {
    let all = dashboard_queues();
    if names.is_empty() {
        return Ok(all);
    }
    names
        .iter()
        .map(|name| {
            all.iter()
                .find(|config| &config.name == name)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("queue '{}' is not in the catalog", name)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::validate_config;
    use crate::domain::{OperationKind, QueueEvent, QueueOp};
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_every_catalog_queue_validates() {
        for config in dashboard_queues() {
            validate_config(&config).unwrap();
        }
    }

    #[test]
    fn test_event_names_are_disjoint_across_queues() {
        let mut seen = HashSet::new();
        for config in dashboard_queues() {
            for event in config.rules.event_names() {
                assert!(seen.insert(event.to_string()), "{} bound twice", event);
            }
        }
    }

    #[test]
    fn test_hyperspace_orders_append_and_key_on_order_id() {
        let orders = select(&[HYPERSPACE_ORDERS.to_string()]).unwrap().remove(0);
        assert_eq!(orders.insert_position, InsertPosition::Append);

        let op = orders
            .rules
            .decode(&QueueEvent::new(
                "newHyperSpaceOrder",
                json!({"order": {"orderId": "o-7", "_id": "mongo"}}),
            ))
            .unwrap()
            .unwrap();
        match op {
            QueueOp::Insert(item) => assert_eq!(item.id, "o-7"),
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_gift_card_redeemed_is_nested_append() {
        let gift = select(&[GIFT_CARD_REDEMPTIONS.to_string()]).unwrap().remove(0);
        assert_eq!(
            gift.rules.classify("giftCardRedeemed"),
            Some(OperationKind::NestedAppend)
        );
        assert_eq!(gift.policy().nested_field.as_deref(), Some("redemptions"));
    }

    #[test]
    fn test_select_unknown_queue_fails() {
        assert_eq!(select(&[]).unwrap().len(), 7);
        assert!(matches!(
            select(&["nope".to_string()]),
            Err(AppError::NotFound(_))
        ));
    }
}
