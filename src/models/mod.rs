// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod meeting;
pub mod user;

pub use meeting::{Meeting, NewMeeting};
pub use user::{User, VerifiedClaims};
