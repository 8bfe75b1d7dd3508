//! Subscriber intake endpoints.
//!
//! Deliberately minimal: enough CRUD to exercise the slot-accounting ledger,
//! which is coupled to subscriber create/update/delete. Everything else about
//! subscriber management lives outside this service.

use axum::extract::{Path, State};
use axum::routing::{delete, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use fiber_billing::{
    AddonItem, EntityId, Money, PeriodUnit, RouterRepository, SlotUseCases, Subscriber,
    SubscriberRepository, UseCaseError,
};
use tracing::warn;

use crate::models::{ApiResponse, ReassignSlotRequest, SubscriberCreate, SubscriberView};
use crate::ApiState;

use super::parse_billing_type;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", post(create_subscriber))
        .route("/:id/odp", put(reassign_slot))
        .route("/:id", delete(remove_subscriber))
}

fn view(subscriber: &Subscriber) -> SubscriberView {
    SubscriberView {
        id: subscriber.id().to_string(),
        sequence: subscriber.sequence().to_string(),
        name: subscriber.name().to_string(),
        package_name: subscriber.package_name().to_string(),
        billing_status: format!("{:?}", subscriber.billing_status()).to_lowercase(),
        service_status: format!("{:?}", subscriber.service_status()).to_lowercase(),
        router_account_status: format!("{:?}", subscriber.router_account_status()).to_lowercase(),
        odp_id: subscriber.odp_ref().map(|id| id.to_string()),
    }
}

/// Register a subscriber. An ODP reference takes a slot atomically with the
/// intake: a full ODP rejects the whole request.
#[utoipa::path(
    post,
    path = "/api/v1/subscribers",
    request_body = SubscriberCreate,
    responses((status = 200, description = "Created subscriber")),
    tag = "subscribers"
)]
pub async fn create_subscriber(
    State(state): State<Arc<ApiState>>,
    Json(input): Json<SubscriberCreate>,
) -> Json<ApiResponse<SubscriberView>> {
    let sequence = state.next_sequence.fetch_add(1, Ordering::Relaxed);
    let mut subscriber = Subscriber::register(
        format!("CUST-{:04}", sequence),
        input.name,
        input.package_name,
        Money::from_units(input.package_price),
        parse_billing_type(input.billing_type.as_deref()),
    );

    if let Some(discount) = input.discount {
        subscriber.set_billing_terms(Money::from_units(discount), 1, PeriodUnit::Months);
    }

    for addon in &input.addons {
        let quantity = addon.quantity.unwrap_or(1);
        let item = match addon.item_type.as_str() {
            "one_time" => {
                AddonItem::one_time(addon.name.as_str(), Money::from_units(addon.price), quantity)
            }
            _ => AddonItem::monthly(addon.name.as_str(), Money::from_units(addon.price), quantity),
        };
        subscriber.add_addon(item);
    }

    // Resolve the router once at the boundary; the core only ever sees a
    // typed reference.
    if let (Some(account), Some(router_name)) = (&input.router_account, &input.router_name) {
        match state.platform.routers.find_by_name(router_name).await {
            Ok(Some(router)) => {
                subscriber.set_router_account(account.as_str(), router.id().clone())
            }
            Ok(None) => {
                return Json(ApiResponse::error(
                    "VALIDATION_ERROR",
                    &format!("unknown router \"{}\"", router_name),
                ));
            }
            Err(err) => {
                return Json(ApiResponse::error("PERSISTENCE_FAILURE", &err.to_string()));
            }
        }
    }

    if let Some(date) = input.activation_date {
        subscriber.activate_service(date);
    }

    if let Err(err) = state.platform.subscribers.save(&subscriber).await {
        return Json(ApiResponse::error("PERSISTENCE_FAILURE", &err.to_string()));
    }

    if let Some(odp_id) = &input.odp_id {
        let odp_ref = EntityId::from_string(odp_id);
        if let Err(err) = state.platform.slots.assign(subscriber.id(), &odp_ref).await {
            // No partial state: the intake fails as a whole.
            if let Err(cleanup_err) = state.platform.subscribers.delete(subscriber.id()).await {
                warn!(error = %cleanup_err, "failed to clean up subscriber after rejected slot");
            }
            return Json(ApiResponse::from_use_case_error(&err));
        }
    }

    match state
        .platform
        .subscribers
        .find_by_id(subscriber.id())
        .await
    {
        Ok(Some(saved)) => Json(ApiResponse::success(view(&saved))),
        Ok(None) => Json(ApiResponse::success(view(&subscriber))),
        Err(err) => Json(ApiResponse::error("PERSISTENCE_FAILURE", &err.to_string())),
    }
}

/// Move a subscriber to another ODP as one atomic slot transfer.
#[utoipa::path(
    put,
    path = "/api/v1/subscribers/{id}/odp",
    params(("id" = String, Path, description = "Subscriber id")),
    request_body = ReassignSlotRequest,
    responses((status = 200, description = "Updated subscriber")),
    tag = "subscribers"
)]
pub async fn reassign_slot(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(request): Json<ReassignSlotRequest>,
) -> Json<ApiResponse<SubscriberView>> {
    let subscriber_id = EntityId::from_string(&id);
    let odp_id = EntityId::from_string(&request.odp_id);

    if let Err(err) = state.platform.slots.reassign(&subscriber_id, &odp_id).await {
        return Json(ApiResponse::from_use_case_error(&err));
    }

    match state.platform.subscribers.find_by_id(&subscriber_id).await {
        Ok(Some(subscriber)) => Json(ApiResponse::success(view(&subscriber))),
        Ok(None) => Json(ApiResponse::from_use_case_error(&UseCaseError::NotFound(
            format!("subscriber {}", id),
        ))),
        Err(err) => Json(ApiResponse::error("PERSISTENCE_FAILURE", &err.to_string())),
    }
}

/// Remove a subscriber, giving its ODP slot back first.
#[utoipa::path(
    delete,
    path = "/api/v1/subscribers/{id}",
    params(("id" = String, Path, description = "Subscriber id")),
    responses((status = 200, description = "Subscriber removed")),
    tag = "subscribers"
)]
pub async fn remove_subscriber(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Json<ApiResponse<serde_json::Value>> {
    let subscriber_id = EntityId::from_string(&id);

    match state.platform.subscribers.find_by_id(&subscriber_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Json(ApiResponse::from_use_case_error(&UseCaseError::NotFound(
                format!("subscriber {}", id),
            )));
        }
        Err(err) => {
            return Json(ApiResponse::error("PERSISTENCE_FAILURE", &err.to_string()));
        }
    }

    if let Err(err) = state.platform.slots.release(&subscriber_id).await {
        return Json(ApiResponse::from_use_case_error(&err));
    }
    if let Err(err) = state.platform.subscribers.delete(&subscriber_id).await {
        return Json(ApiResponse::error("PERSISTENCE_FAILURE", &err.to_string()));
    }

    Json(ApiResponse::success(serde_json::json!({ "deleted": id })))
}
