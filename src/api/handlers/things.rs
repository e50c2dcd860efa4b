use super::{Category, MyThingOut};
use crate::{
    api::guard::{detail, Principal},
    storage::{InsertOutcome, NewThing, ThingStore},
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct MyThingIn {
    pub thing_name: String,
    pub thing_description: Option<String>,
    pub category: Category,
}

#[utoipa::path(
    post,
    path = "/user/add_thing",
    request_body = MyThingIn,
    responses(
        (status = 201, description = "Thing added to the current user", body = MyThingOut),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 409, description = "That thing already exists"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn add_thing(
    Extension(principal): Extension<Principal>,
    Extension(things): Extension<Arc<dyn ThingStore>>,
    payload: Option<Json<MyThingIn>>,
) -> Response {
    let Some(Json(thing)) = payload else {
        return detail(StatusCode::BAD_REQUEST, "Invalid thing payload");
    };

    let thing_name = thing.thing_name.trim().to_string();
    if thing_name.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "Invalid thing name");
    }

    let new_thing = NewThing {
        thing_name,
        thing_description: thing.thing_description,
        category_name: thing.category.category_name,
    };

    match things.insert_thing(&principal.user, new_thing).await {
        Ok(InsertOutcome::Created(thing)) => {
            info!(owner = %thing.owner, thing = %thing.thing_name, "thing added");
            (StatusCode::CREATED, Json(MyThingOut::from(thing))).into_response()
        }
        Ok(InsertOutcome::Conflict) => detail(StatusCode::CONFLICT, "That thing already exists"),
        Err(err) => {
            error!("Failed to add thing: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/user/my_things",
    responses(
        (status = 200, description = "Things owned by the current user", body = [MyThingOut]),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn my_things(
    Extension(principal): Extension<Principal>,
    Extension(things): Extension<Arc<dyn ThingStore>>,
) -> Response {
    match things.things_for_owner(&principal.user).await {
        Ok(list) => {
            let list: Vec<MyThingOut> = list.into_iter().map(MyThingOut::from).collect();
            Json(list).into_response()
        }
        Err(err) => {
            error!("Failed to list things: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
