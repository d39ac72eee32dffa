//! Tests that drive real `git` in temporary repositories.

mod common;
mod recipe_tests;
mod revision_tests;
