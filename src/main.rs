use actix_cors::Cors;
use actix_web::{delete, get, patch, post, put, web, App, HttpResponse, HttpServer};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod auth;
mod bill;
mod config;
mod db;
mod errors;
mod pricing;
mod schemas;
mod seed;
mod watch;

use auth::Session;
use bill::compute_bill_from_group;
use config::Config;
use db::{ensure_creator, ensure_member, fetch_group, fetch_vendor, groups, users, vendors};
use errors::ApiError;
use pricing::{order_price, Selection};
use schemas::{
    new_invite_code, normalize_invite_code, Group, Order, OrderStatus, User, UserId, Vendor,
};
use watch::GroupWatch;

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupJson {
    name: String,
    #[serde(default)]
    vendor_id: Option<String>,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinJson {
    invite_code: String,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct VendorChoiceJson {
    vendor_id: String,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusJson {
    status: OrderStatus,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileJson {
    #[serde(default)]
    display_name: String,
    email: String,
    #[serde(default)]
    photo_url: Option<String>,
}

/// The caller's saved order, or a priced pre-fill when they haven't ordered.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderDraft {
    #[serde(flatten)]
    selection: Selection,
    price: u32,
}

fn return_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

#[get("/vendors")]
async fn list_vendors(client: web::Data<Client>) -> Result<HttpResponse, ApiError> {
    let all: Vec<Vendor> = vendors(&client).find(None, None).await?.try_collect().await?;
    Ok(HttpResponse::Ok().json(all))
}

#[get("/vendors/{id}")]
async fn get_vendor(
    client: web::Data<Client>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let vendor = fetch_vendor(&client, &id).await?;
    Ok(HttpResponse::Ok().json(vendor))
}

/// First sign-in creates the profile document; later calls update it in
/// place and keep the original creation time.
#[put("/users/me")]
async fn upsert_profile(
    client: web::Data<Client>,
    session: Session,
    json: web::Json<ProfileJson>,
) -> Result<HttpResponse, ApiError> {
    let profile = json.into_inner();
    let display_name = if profile.display_name.trim().is_empty() {
        profile.email.split('@').next().unwrap_or("").to_string()
    } else {
        profile.display_name.trim().to_string()
    };

    if users(&client)
        .find_one(doc! { "uid": session.uid.as_str() }, None)
        .await?
        .is_some()
    {
        let update = doc! { "$set": {
            "displayName": display_name.as_str(),
            "email": profile.email.as_str(),
            "photoUrl": bson::to_bson(&profile.photo_url)?,
        }};
        let updated = users(&client)
            .find_one_and_update(doc! { "uid": session.uid.as_str() }, update, return_updated())
            .await?
            .ok_or(ApiError::NotFound("user"))?;
        return Ok(HttpResponse::Ok().json(updated));
    }

    let user = User {
        uid: session.uid,
        display_name,
        email: profile.email,
        photo_url: profile.photo_url,
        created_at: Utc::now(),
    };
    users(&client).insert_one(&user, None).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[get("/users/{id}")]
async fn get_profile(
    client: web::Data<Client>,
    _session: Session,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user = users(&client)
        .find_one(doc! { "uid": id.into_inner() }, None)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(HttpResponse::Ok().json(user))
}

#[put("/groups/{id}")]
async fn add_group(
    client: web::Data<Client>,
    session: Session,
    id: web::Path<String>,
    json: web::Json<GroupJson>,
) -> Result<HttpResponse, ApiError> {
    let json = json.into_inner();
    let name = json.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::MissingField("group name"));
    }
    let selected_vendor = match &json.vendor_id {
        Some(vendor_id) => Some(fetch_vendor(&client, vendor_id).await?),
        None => None,
    };
    let group = Group {
        id: id.into_inner(),
        name,
        members: vec![session.uid.clone()],
        created_by: session.uid,
        invite_code: new_invite_code(),
        order_status: selected_vendor.as_ref().map(|_| OrderStatus::Pending),
        selected_vendor,
        member_orders: HashMap::new(),
        created_at: Utc::now(),
    };
    groups(&client).insert_one(&group, None).await?;
    Ok(HttpResponse::Ok().json(group))
}

#[get("/groups")]
async fn my_groups(
    client: web::Data<Client>,
    session: Session,
) -> Result<HttpResponse, ApiError> {
    let mine: Vec<Group> = groups(&client)
        .find(doc! { "members": session.uid.as_str() }, None)
        .await?
        .try_collect()
        .await?;
    Ok(HttpResponse::Ok().json(mine))
}

#[get("/groups/{id}")]
async fn get_group(
    client: web::Data<Client>,
    session: Session,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let group = fetch_group(&client, &id).await?;
    ensure_member(&group, &session.uid)?;
    Ok(HttpResponse::Ok().json(group))
}

#[post("/groups/join")]
async fn join_group(
    client: web::Data<Client>,
    session: Session,
    json: web::Json<JoinJson>,
    watch: web::Data<GroupWatch>,
) -> Result<HttpResponse, ApiError> {
    let code = normalize_invite_code(&json.into_inner().invite_code);
    let group = groups(&client)
        .find_one(doc! { "inviteCode": code.as_str() }, None)
        .await?
        .ok_or(ApiError::InvalidInviteCode)?;
    if ensure_member(&group, &session.uid).is_ok() {
        return Ok(HttpResponse::Ok().json(group));
    }
    let updated = groups(&client)
        .find_one_and_update(
            doc! { "id": group.id.as_str() },
            doc! { "$addToSet": { "members": session.uid.as_str() } },
            return_updated(),
        )
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    watch.publish(&updated);
    Ok(HttpResponse::Ok().json(updated))
}

/// Switching vendors drops the saved orders: they were priced against the
/// old catalog and would silently go stale.
#[post("/groups/{id}/vendor")]
async fn select_vendor(
    client: web::Data<Client>,
    session: Session,
    id: web::Path<String>,
    json: web::Json<VendorChoiceJson>,
    watch: web::Data<GroupWatch>,
) -> Result<HttpResponse, ApiError> {
    let group = fetch_group(&client, &id).await?;
    ensure_creator(&group, &session.uid)?;
    let vendor = fetch_vendor(&client, &json.vendor_id).await?;
    let update = doc! { "$set": {
        "selectedVendor": bson::to_bson(&vendor)?,
        "orderStatus": bson::to_bson(&OrderStatus::Pending)?,
        "memberOrders": {},
    }};
    let updated = groups(&client)
        .find_one_and_update(doc! { "id": group.id.as_str() }, update, return_updated())
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    watch.publish(&updated);
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/groups/{id}/vendor")]
async fn clear_vendor(
    client: web::Data<Client>,
    session: Session,
    id: web::Path<String>,
    watch: web::Data<GroupWatch>,
) -> Result<HttpResponse, ApiError> {
    let group = fetch_group(&client, &id).await?;
    ensure_creator(&group, &session.uid)?;
    let update = doc! { "$set": {
        "selectedVendor": bson::Bson::Null,
        "orderStatus": bson::Bson::Null,
        "memberOrders": {},
    }};
    let updated = groups(&client)
        .find_one_and_update(doc! { "id": group.id.as_str() }, update, return_updated())
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    watch.publish(&updated);
    Ok(HttpResponse::Ok().json(updated))
}

#[get("/groups/{id}/order")]
async fn get_order(
    client: web::Data<Client>,
    session: Session,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let group = fetch_group(&client, &id).await?;
    ensure_member(&group, &session.uid)?;
    let vendor = group
        .selected_vendor
        .as_ref()
        .ok_or(ApiError::NoVendorSelected)?;
    let draft = match group.member_orders.get(&session.uid) {
        Some(order) => OrderDraft {
            selection: Selection {
                base_option_id: order.base_option_id.clone(),
                portion_id: order.portion_id.clone(),
                selected_add_on_ids: order.selected_add_on_ids.clone(),
                special_instructions: order.special_instructions.clone(),
            },
            price: order.price,
        },
        None => {
            let selection = vendor
                .tiffin_options
                .default_selection()
                .ok_or(ApiError::EmptyCatalog)?;
            let price = order_price(&vendor.tiffin_options, &selection)?;
            OrderDraft { selection, price }
        }
    };
    Ok(HttpResponse::Ok().json(draft))
}

/// Saves the caller's meal wholesale under `memberOrders.<uid>`; the price
/// is always computed server-side from the group's current catalog.
#[put("/groups/{id}/order")]
async fn save_order(
    client: web::Data<Client>,
    session: Session,
    id: web::Path<String>,
    json: web::Json<Selection>,
    watch: web::Data<GroupWatch>,
) -> Result<HttpResponse, ApiError> {
    let group = fetch_group(&client, &id).await?;
    ensure_member(&group, &session.uid)?;
    let vendor = group
        .selected_vendor
        .as_ref()
        .ok_or(ApiError::NoVendorSelected)?;

    let selection = json.into_inner();
    vendor
        .tiffin_options
        .special_instructions
        .check(&selection.special_instructions)?;
    let price = order_price(&vendor.tiffin_options, &selection)?;
    let order = Order {
        base_option_id: selection.base_option_id,
        portion_id: selection.portion_id,
        selected_add_on_ids: selection.selected_add_on_ids,
        special_instructions: selection.special_instructions,
        price,
        last_updated: Utc::now(),
    };

    let mut set = Document::new();
    set.insert(
        format!("memberOrders.{}", session.uid),
        bson::to_bson(&order)?,
    );
    let updated = groups(&client)
        .find_one_and_update(doc! { "id": group.id.as_str() }, doc! { "$set": set }, return_updated())
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    watch.publish(&updated);
    Ok(HttpResponse::Ok().json(order))
}

#[patch("/groups/{id}/status")]
async fn update_status(
    client: web::Data<Client>,
    session: Session,
    id: web::Path<String>,
    json: web::Json<StatusJson>,
    watch: web::Data<GroupWatch>,
) -> Result<HttpResponse, ApiError> {
    let group = fetch_group(&client, &id).await?;
    ensure_creator(&group, &session.uid)?;
    if group.selected_vendor.is_none() {
        return Err(ApiError::NoVendorSelected);
    }
    let update = doc! { "$set": { "orderStatus": bson::to_bson(&json.status)? } };
    let updated = groups(&client)
        .find_one_and_update(doc! { "id": group.id.as_str() }, update, return_updated())
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    watch.publish(&updated);
    Ok(HttpResponse::Ok().json(updated))
}

#[get("/groups/{id}/bill")]
async fn get_bill(
    client: web::Data<Client>,
    session: Session,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let group = fetch_group(&client, &id).await?;
    ensure_member(&group, &session.uid)?;
    let members: Vec<User> = users(&client)
        .find(doc! { "uid": { "$in": group.members.clone() } }, None)
        .await?
        .try_collect()
        .await?;
    let names: HashMap<UserId, String> = members
        .into_iter()
        .map(|user| (user.uid, user.display_name))
        .collect();
    Ok(HttpResponse::Ok().json(compute_bill_from_group(&group, &names)))
}

/// Server-sent events: the current snapshot, then one event per write until
/// the viewer hangs up.
#[get("/groups/{id}/live")]
async fn live_group(
    client: web::Data<Client>,
    session: Session,
    id: web::Path<String>,
    watch: web::Data<GroupWatch>,
) -> Result<HttpResponse, ApiError> {
    // Register before reading the opening snapshot so a write landing in
    // between still reaches this viewer. An early error drops the receiver.
    let updates = watch.subscribe(&id);
    let group = fetch_group(&client, &id).await?;
    ensure_member(&group, &session.uid)?;
    let events = stream::once(async move { group }).chain(updates).map(|snapshot| {
        serde_json::to_string(&snapshot)
            .map(|json| web::Bytes::from(format!("data: {json}\n\n")))
            .map_err(actix_web::error::ErrorInternalServerError)
    });
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::from_env();
    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .expect("failed to connect");
    log::info!("Connected to the document store");

    if config.seed_vendors {
        if let Err(err) = seed::seed_vendors(&client).await {
            log::warn!("Vendor seed failed: {err}");
        }
    }

    let bind_addr = config.bind_addr();
    let config = web::Data::new(config);
    let watch = web::Data::new(GroupWatch::new());
    log::info!("Listening on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(web::Data::new(client.clone()))
            .app_data(config.clone())
            .app_data(watch.clone())
            .service(list_vendors)
            .service(get_vendor)
            .service(upsert_profile)
            .service(get_profile)
            .service(my_groups)
            .service(join_group)
            .service(add_group)
            .service(get_group)
            .service(select_vendor)
            .service(clear_vendor)
            .service(get_order)
            .service(save_order)
            .service(update_status)
            .service(get_bill)
            .service(live_group)
    })
    .bind(bind_addr)?
    .run()
    .await
}
