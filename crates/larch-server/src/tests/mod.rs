//! Unit and behavioural tests for the controller.

mod support;
