//! Rate limiting middleware.
//!
//! Provides per-user rate limiting for authenticated API routes.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovRateLimiter,
};
use serde_json::json;
use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::user_auth::UserAuth;

/// Type alias for the rate limiter used per user.
type UserRateLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter state shared across all requests.
/// Uses a HashMap keyed by user ID with individual rate limiters.
pub struct RateLimiterState {
    limiters: RwLock<HashMap<Uuid, Arc<UserRateLimiter>>>,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// Create a new rate limiter state with the specified limit per minute.
    pub fn new(rate_limit_per_minute: u32) -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
            rate_limit_per_minute,
        }
    }

    /// Get or create a rate limiter for the given user ID.
    fn get_or_create_limiter(&self, user_id: Uuid) -> Arc<UserRateLimiter> {
        // First try to get existing limiter with read lock
        {
            let limiters = self.limiters.read().unwrap();
            if let Some(limiter) = limiters.get(&user_id) {
                return limiter.clone();
            }
        }

        // Create new limiter with write lock
        let mut limiters = self.limiters.write().unwrap();

        // Double-check in case another thread created it
        if let Some(limiter) = limiters.get(&user_id) {
            return limiter.clone();
        }

        let quota = Quota::per_minute(
            NonZeroU32::new(self.rate_limit_per_minute).unwrap_or(NonZeroU32::new(100).unwrap()),
        );
        let limiter = Arc::new(GovRateLimiter::direct(quota));
        limiters.insert(user_id, limiter.clone());
        limiter
    }

    /// Check if a request from the given user should be allowed.
    /// Returns Ok(()) if allowed, or Err with retry_after seconds if rate limited.
    pub fn check(&self, user_id: Uuid) -> Result<(), u64> {
        let limiter = self.get_or_create_limiter(user_id);

        match limiter.check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time = not_until.wait_time_from(governor::clock::Clock::now(
                    &governor::clock::DefaultClock::default(),
                ));
                // Return retry after in seconds, minimum 1 second
                Err(wait_time.as_secs().max(1))
            }
        }
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("active_limiters", &self.limiters.read().unwrap().len())
            .finish()
    }
}

impl Clone for RateLimiterState {
    fn clone(&self) -> Self {
        // Clone creates a new state that shares the same limiters
        Self {
            limiters: RwLock::new(self.limiters.read().unwrap().clone()),
            rate_limit_per_minute: self.rate_limit_per_minute,
        }
    }
}

/// Middleware that applies rate limiting per authenticated user.
///
/// This middleware must run AFTER authentication so that the user ID
/// is available in request extensions.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // Get the authenticated user from request extensions
    // If no auth info, skip rate limiting (request will fail auth anyway)
    let auth = match req.extensions().get::<UserAuth>() {
        Some(auth) => auth.clone(),
        None => return next.run(req).await,
    };

    if let Some(ref rate_limiter) = state.rate_limiter {
        if let Err(retry_after) = rate_limiter.check(auth.user_id) {
            return rate_limited_response(state.config.security.rate_limit_per_minute, retry_after);
        }
    }

    next.run(req).await
}

/// Create a rate limited response with proper headers and body.
fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limit_exceeded",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

    response.headers_mut().insert(
        header::RETRY_AFTER,
        retry_after.to_string().parse().unwrap(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_state_creation() {
        let state = RateLimiterState::new(100);
        assert_eq!(state.rate_limit_per_minute, 100);
    }

    #[test]
    fn test_rate_limiter_allows_requests() {
        let state = RateLimiterState::new(100);
        assert!(state.check(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_rate_limiter_exhaustion() {
        // Use very low limit to test exhaustion
        let state = RateLimiterState::new(1);
        let user_id = Uuid::new_v4();

        assert!(state.check(user_id).is_ok());

        // Second request should be rate limited
        let result = state.check(user_id);
        assert!(result.is_err());
        // Retry-after should be at least 1 second
        assert!(result.unwrap_err() >= 1);
    }

    #[test]
    fn test_rate_limiter_different_users_independent() {
        let state = RateLimiterState::new(1);
        let user1 = Uuid::new_v4();
        let user2 = Uuid::new_v4();
        let user3 = Uuid::new_v4();

        // Each user should have independent limits
        assert!(state.check(user1).is_ok());
        assert!(state.check(user2).is_ok());
        assert!(state.check(user3).is_ok());

        assert!(state.check(user1).is_err());
        assert!(state.check(user2).is_err());
        assert!(state.check(user3).is_err());
    }

    #[test]
    fn test_rate_limiter_same_user_multiple_checks() {
        let state = RateLimiterState::new(5);
        let user_id = Uuid::new_v4();

        for i in 0..5 {
            let result = state.check(user_id);
            assert!(result.is_ok(), "Request {} should be allowed", i);
        }

        // 6th request should be rate limited
        assert!(state.check(user_id).is_err());
    }

    #[test]
    fn test_rate_limiter_state_debug() {
        let state = RateLimiterState::new(100);
        let debug = format!("{:?}", state);
        assert!(debug.contains("RateLimiterState"));
        assert!(debug.contains("rate_limit_per_minute"));
        assert!(debug.contains("100"));
        assert!(debug.contains("active_limiters"));
    }

    #[test]
    fn test_rate_limiter_state_clone_shares_limiters() {
        let state = RateLimiterState::new(100);
        let user1 = Uuid::new_v4();
        let user2 = Uuid::new_v4();
        state.check(user1).unwrap();
        state.check(user2).unwrap();

        let cloned = state.clone();
        assert!(cloned.check(user1).is_ok());
        assert!(cloned.check(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_rate_limiter_get_or_create_idempotent() {
        let state = RateLimiterState::new(100);
        let user_id = Uuid::new_v4();

        let limiter1 = state.get_or_create_limiter(user_id);
        let limiter2 = state.get_or_create_limiter(user_id);

        // Should be the same Arc (same underlying object)
        assert!(Arc::ptr_eq(&limiter1, &limiter2));
    }

    #[test]
    fn test_rate_limited_response_format() {
        let response = rate_limited_response(100, 60);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }
}
