//! Core library for hakbot, a school information chatbot.
//!
//! Loads meals, events and timetables from flat files, answers free-text
//! questions about them, and persists chat history for signed-in users.

pub mod chat;
pub mod config;
pub mod data;
pub mod error;
pub mod interpret;
pub mod model;
pub mod storage;
pub mod text;
