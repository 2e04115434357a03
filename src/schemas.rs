use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ApiError;

pub type UserId = String;

/// Profile document, created on first sign-in.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: UserId,
    pub display_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: String,
    pub name: String,
    pub cuisine: String,
    pub rating: f64,
    pub delivery_time: String,
    pub description: String,
    #[serde(default)]
    pub min_order: u32,
    #[serde(default)]
    pub delivery_fee: u32,
    pub tiffin_options: TiffinOptions,
}

/// The per-vendor meal catalog an order is priced against.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TiffinOptions {
    pub base_options: Vec<BaseOption>,
    pub portion_sizes: Vec<PortionSize>,
    pub add_ons: Vec<AddOn>,
    #[serde(default)]
    pub special_instructions: InstructionPolicy,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseOption {
    pub id: String,
    pub name: String,
    pub base_price: u32,
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortionSize {
    pub id: String,
    pub name: String,
    pub multiplier: f64,
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
    pub id: String,
    pub name: String,
    pub price: u32,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionPolicy {
    pub max_length: usize,
    pub examples: String,
}

impl Default for InstructionPolicy {
    fn default() -> Self {
        InstructionPolicy {
            max_length: 100,
            examples: String::new(),
        }
    }
}

impl InstructionPolicy {
    /// Length bound for a member's free-text note, counted in characters.
    pub fn check(&self, text: &str) -> Result<(), ApiError> {
        if text.chars().count() > self.max_length {
            Err(ApiError::InstructionsTooLong(self.max_length))
        } else {
            Ok(())
        }
    }
}

/// A member's meal for the group order. Saved wholesale on every change,
/// last write wins.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub base_option_id: String,
    pub portion_id: String,
    #[serde(default)]
    pub selected_add_on_ids: Vec<String>,
    #[serde(default)]
    pub special_instructions: String,
    pub price: u32,
    pub last_updated: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    OnTheWay,
    Delivered,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub members: Vec<UserId>,
    pub created_by: UserId,
    pub invite_code: String,
    #[serde(default)]
    pub selected_vendor: Option<Vendor>,
    #[serde(default)]
    pub member_orders: HashMap<UserId, Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
    pub created_at: DateTime<Utc>,
}

const INVITE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const INVITE_CODE_LEN: usize = 6;

/// Shareable join token, uppercase so codes survive being read out loud.
pub fn new_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_CHARSET[rng.gen_range(0..INVITE_CHARSET.len())] as char)
        .collect()
}

/// Codes get typed or pasted by hand; stray whitespace and lowercase are
/// forgiven before lookup.
pub fn normalize_invite_code(code: &str) -> String {
    code.trim().to_uppercase()
}
