/*
 * This module provides the application logic layer, centered around
 * `SnippetAppLogic` which acts as the Presenter/Controller between the core
 * model and the platform layer. Unit tests for `SnippetAppLogic` are in
 * `handler_tests.rs`.
 */
pub mod handler;


pub use handler::SnippetAppLogic;
