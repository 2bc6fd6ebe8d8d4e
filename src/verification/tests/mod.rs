mod common;

mod advisory;
mod rules;
mod service;
