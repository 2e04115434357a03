use mongodb::bson::doc;
use mongodb::{Client, Collection};

use crate::errors::ApiError;
use crate::schemas::{Group, User, Vendor};

const DB_NAME: &str = "TiffinSync";

pub fn groups(client: &Client) -> Collection<Group> {
    client.database(DB_NAME).collection("Groups")
}

pub fn vendors(client: &Client) -> Collection<Vendor> {
    client.database(DB_NAME).collection("Vendors")
}

pub fn users(client: &Client) -> Collection<User> {
    client.database(DB_NAME).collection("Users")
}

pub async fn fetch_group(client: &Client, id: &str) -> Result<Group, ApiError> {
    groups(client)
        .find_one(doc! { "id": id }, None)
        .await?
        .ok_or(ApiError::NotFound("group"))
}

pub async fn fetch_vendor(client: &Client, id: &str) -> Result<Vendor, ApiError> {
    vendors(client)
        .find_one(doc! { "id": id }, None)
        .await?
        .ok_or(ApiError::NotFound("vendor"))
}

pub fn ensure_member(group: &Group, uid: &str) -> Result<(), ApiError> {
    if group.members.iter().any(|member| member == uid) {
        Ok(())
    } else {
        Err(ApiError::NotAMember)
    }
}

pub fn ensure_creator(group: &Group, uid: &str) -> Result<(), ApiError> {
    ensure_member(group, uid)?;
    if group.created_by == uid {
        Ok(())
    } else {
        Err(ApiError::CreatorOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn group() -> Group {
        Group {
            id: "g1".into(),
            name: "Office Lunch".into(),
            members: vec!["creator".into(), "member".into()],
            created_by: "creator".into(),
            invite_code: "AB12CD".into(),
            selected_vendor: None,
            member_orders: HashMap::new(),
            order_status: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn membership_guard() {
        assert!(ensure_member(&group(), "member").is_ok());
        assert!(matches!(
            ensure_member(&group(), "stranger"),
            Err(ApiError::NotAMember)
        ));
    }

    #[test]
    fn creator_guard_rejects_plain_members() {
        assert!(ensure_creator(&group(), "creator").is_ok());
        assert!(matches!(
            ensure_creator(&group(), "member"),
            Err(ApiError::CreatorOnly)
        ));
        assert!(matches!(
            ensure_creator(&group(), "stranger"),
            Err(ApiError::NotAMember)
        ));
    }
}
