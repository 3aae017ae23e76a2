//! Backend for an assistant that drafts legal documents.
//!
//! Conversations and their document versions are kept in `SQLite`, chat turns
//! are proxied to Gemini, and documents export to PDF.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![warn(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(non_camel_case_types)]
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(nonstandard_style)] // Empêche tout style de code non standard
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy pour stricte discipline
#![deny(clippy::all)] // Active toutes les lints Clippy standard
#![cfg_attr(not(test), deny(clippy::unwrap_used))] // Interdit unwrap()
#![cfg_attr(not(test), deny(clippy::expect_used))] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)] // Interdit les TODO dans le code
#![deny(clippy::unimplemented)] // Interdit les fonctions non implémentées
#![deny(clippy::redundant_clone)] // Interdit les clones inutiles
#![deny(clippy::too_many_arguments)] // Limite le nombre d’arguments des fonctions

/// Configuration loaded once at startup.
pub mod config;
/// Gemini chat client and reply classification.
pub mod llm;
/// Markdown to PDF export.
#[allow(clippy::cast_precision_loss)]
pub mod pdf;
/// HTTP server and API routes.
#[allow(clippy::missing_errors_doc, clippy::unused_async)]
pub mod server;
/// Entry helpers to start the server.
pub mod start_lexdraft;
/// Conversation store with document version history.
pub mod store;
