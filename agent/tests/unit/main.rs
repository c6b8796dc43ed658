//! Integration tests for fortivault

mod fakes;
mod test_cycle;
mod test_fsm;
mod test_orchestrator;
