//! Data models for the vidtrends backend.
//!
//! This module contains the payload types exchanged with the API:
//!
//! - `User`: accounts, plus the login/register response shapes
//! - `FavoriteVideo`, `NewFavorite`: a user's saved videos
//! - `TrendingVideo`, `TrendAnalysis`, `TrendQuery`: trending charts
//! - `RecommendedVideo`, `UserPreferences`, `ViewRecord`: recommendations
//! - `Ack`: the envelope mutation endpoints answer with

pub mod recommendation;
pub mod trend;
pub mod user;
pub mod video;

pub use recommendation::{RecommendedVideo, UserPreferences, ViewRecord};
pub use trend::{TrendAnalysis, TrendQuery, TrendingVideo};
pub use user::{Ack, LoginResponse, RegisterResponse, User};
pub use video::{FavoriteVideo, NewFavorite};
