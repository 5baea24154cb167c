//! Step definitions and scenarios for session behaviour.

mod bdd_steps;
mod scenarios;
mod test_helpers;
