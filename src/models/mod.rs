// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod family;
pub mod member;
pub mod record;
pub mod user;

pub use family::{Family, FamilyInvite, FamilyUser};
pub use member::{FamilyMember, GrowthRecord, Vaccination};
pub use record::{Attachment, Record, RecordWithMember, Treatment};
pub use user::{User, UserProfile};
