//! Test helpers para nexus-gateway.

#![allow(dead_code, unused_imports)]

pub mod client;
pub mod gateway;

pub use client::{TestClient, TestResponse, client};
pub use gateway::{Gateway, gateway, name_body};
