//! Storefront Chat - live-chat broker and client transport.
//!
//! The broker side owns chat sessions and their message sequence and serves
//! them over a persistent socket and a REST polling resource. The client side
//! keeps a widget attached to one session, preferring the socket and falling
//! back to polling when the socket cannot be held.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
