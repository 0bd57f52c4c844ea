//! Ticket credit endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use domain::models::ticket::{Ticket, TicketResponse};
use persistence::entities::TicketStatusDb;
use persistence::repositories::TicketRepository;
use shared::pagination::{Paged, PageInfo, PaginationParams};

/// Query parameters for ticket listing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListTicketsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Optional status filter: active, used or expired.
    pub status: Option<TicketStatusFilter>,
}

impl ListTicketsQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// Ticket status filter accepted on the query string.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatusFilter {
    Active,
    Used,
    Expired,
}

impl From<TicketStatusFilter> for TicketStatusDb {
    fn from(filter: TicketStatusFilter) -> Self {
        match filter {
            TicketStatusFilter::Active => TicketStatusDb::Active,
            TicketStatusFilter::Used => TicketStatusDb::Used,
            TicketStatusFilter::Expired => TicketStatusDb::Expired,
        }
    }
}

/// List the caller's tickets, paginated and optionally filtered by status.
///
/// GET /api/tickets?status=active&page=1&per_page=20
pub async fn list_tickets(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<ListTicketsQuery>,
) -> Result<Json<Paged<TicketResponse>>, ApiError> {
    let now = Utc::now();
    let params = query.pagination();
    let status = query.status.map(TicketStatusDb::from);
    let repo = TicketRepository::new(state.pool.clone());

    let entities = repo
        .list_for_user(auth.user_id, status, params.limit(), params.offset())
        .await?;
    let total = repo.count_for_user(auth.user_id, status).await?;

    let data = entities
        .into_iter()
        .map(|e| TicketResponse::from_ticket(Ticket::from(e), now))
        .collect();

    Ok(Json(Paged {
        data,
        pagination: PageInfo::new(params, total),
    }))
}

/// Fetch one of the caller's tickets.
///
/// GET /api/tickets/:id
pub async fn get_ticket(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketResponse>, ApiError> {
    let repo = TicketRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id_for_user(id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;

    Ok(Json(TicketResponse::from_ticket(
        Ticket::from(entity),
        Utc::now(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let query = ListTicketsQuery::default();
        let params = query.pagination();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, shared::pagination::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_pagination_overrides() {
        let query = ListTicketsQuery {
            page: Some(3),
            per_page: Some(10),
            status: None,
        };
        let params = query.pagination();
        assert_eq!(params.page, 3);
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn test_status_filter_deserialization() {
        let filter: TicketStatusFilter = serde_json::from_str(r#""active""#).unwrap();
        assert!(matches!(filter, TicketStatusFilter::Active));
        assert!(serde_json::from_str::<TicketStatusFilter>(r#""unknown""#).is_err());
    }

    #[test]
    fn test_status_filter_conversion() {
        assert_eq!(
            TicketStatusDb::from(TicketStatusFilter::Used),
            TicketStatusDb::Used
        );
        assert_eq!(
            TicketStatusDb::from(TicketStatusFilter::Expired),
            TicketStatusDb::Expired
        );
    }
}
