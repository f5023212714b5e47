//! # haven-core — Foundational Types for the Haven Rental Platform
//!
//! This crate is the bedrock of the Haven workspace. It defines the
//! type-system primitives shared by every other crate; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** [`ApplicationId`],
//!    [`LeaseId`], [`PaymentId`], [`NotificationId`], [`ActorId`],
//!    [`PropertyId`] — all distinct types over UUIDs. No bare strings or
//!    naked UUIDs for identifiers: you cannot pass a lease id where a
//!    payment id is expected.
//!
//! 2. **Integer money.** [`Money`] is a cent-denominated integer newtype.
//!    No floats anywhere near an amount.
//!
//! 3. **One `Role` enum.** Four variants, exhaustive `match` everywhere.
//!    Adding a role forces every consumer to handle it.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `haven-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod error;
pub mod identity;
pub mod money;
pub mod role;

pub use error::ValidationError;
pub use identity::{Actor, ActorId, ApplicationId, LeaseId, NotificationId, PaymentId, PropertyId};
pub use money::Money;
pub use role::Role;
