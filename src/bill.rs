use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::schemas::{Group, UserId};

/// One member's line on the group bill. Members who haven't saved an order
/// yet still appear, with a zero total and no selection.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberShare {
    pub member: UserId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_option_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portion_id: Option<String>,
    pub add_ons: Vec<String>,
    pub special_instructions: String,
    pub total: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub group_total: u32,
    pub shares: Vec<MemberShare>,
}

/// Splits the group bill per member using the prices stored on each saved
/// order. Shares come back largest first, ties broken by member id so the
/// output is stable.
pub fn compute_bill_from_group(group: &Group, names: &HashMap<UserId, String>) -> Bill {
    let mut shares: Vec<MemberShare> = group
        .members
        .iter()
        .map(|member| {
            let name = names
                .get(member)
                .cloned()
                .unwrap_or_else(|| placeholder_name(member));
            match group.member_orders.get(member) {
                Some(order) => MemberShare {
                    member: member.clone(),
                    name,
                    base_option_id: Some(order.base_option_id.clone()),
                    portion_id: Some(order.portion_id.clone()),
                    add_ons: order.selected_add_on_ids.clone(),
                    special_instructions: order.special_instructions.clone(),
                    total: order.price,
                    last_updated: Some(order.last_updated),
                },
                None => MemberShare {
                    member: member.clone(),
                    name,
                    base_option_id: None,
                    portion_id: None,
                    add_ons: Vec::new(),
                    special_instructions: String::new(),
                    total: 0,
                    last_updated: None,
                },
            }
        })
        .collect();

    shares.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.member.cmp(&b.member)));
    let group_total = shares.iter().map(|share| share.total).sum();

    Bill {
        group_total,
        shares,
    }
}

fn placeholder_name(member: &UserId) -> String {
    format!("User {}", member.chars().take(4).collect::<String>())
}
